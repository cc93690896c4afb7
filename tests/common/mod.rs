//! Common test utilities for integration tests
#![allow(dead_code)]

use census2010::batch::{BatchSummary, OutputSink, ProgressReporter};
use census2010::catalog::{Catalog, CatalogSource};
use census2010::driver::{
    start_session, DriverError, DriverResult, ElementRef, Locator, PageDriver, SessionFactory,
    SessionSetup,
};
use census2010::errors::{AppError, AppResult};
use census2010::models::Outcome;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

/// Region page URL used by every test.
pub const TEST_BASE_URL: &str = "http://census.test/munst{region}/DBInet.cgi";

/// Inner markup served by the fake output table.
pub const SAMPLE_TABLE: &str = concat!(
    "<tr><td class='bL0'>Муниципальный район</td><td></td></tr>",
    "<tr><td class='TblBok'>Поселение 1</td><td>120</td></tr>",
    "<tr><td class='TblBok'>Поселение 2</td><td>87</td></tr>",
);

/// Two regions and two indicators; `beta` has no data for region 02.
pub const TEST_CATALOG: &str = r#"
region_codes = ["01", "02"]

[default_template]
munr = "*"
tippos = "*"
oktmo = "*"
god = "2010"
period = "значение показателя за год"
available = "yes"

[indicators.alpha]
id = 101

[indicators.beta]
id = 102
template = { god = ["2010", "2012"] }

[indicators.beta.regions."02"]
available = "no"
"#;

/// Fields rendered on the fake form with their option labels.
const FORM_FIELDS: [(&str, &[&str]); 5] = [
    ("munr", &["Все"]),
    ("tippos", &["Все"]),
    ("oktmo", &["Все"]),
    ("god", &["2010", "2011", "2012"]),
    ("period", &["значение показателя за год", "январь-март"]),
];

pub fn test_catalog() -> Catalog {
    Catalog::from_toml_str(TEST_CATALOG).unwrap()
}

/// [`test_catalog`] without region 02.
pub fn catalog_without_02() -> Catalog {
    let toml = TEST_CATALOG
        .replace(r#"region_codes = ["01", "02"]"#, r#"region_codes = ["01"]"#)
        .replace("[indicators.beta.regions.\"02\"]\navailable = \"no\"\n", "");
    Catalog::from_toml_str(&toml).unwrap()
}

/// Serves scripted fetch results in order, then `fallback` forever.
///
/// `None` in the script fails that fetch.
#[derive(Debug)]
pub struct ScriptedCatalog {
    script: RefCell<VecDeque<Option<Catalog>>>,
    fallback: Catalog,
    pub fetches: Cell<usize>,
}

impl ScriptedCatalog {
    pub fn new(script: Vec<Option<Catalog>>) -> Self {
        Self {
            script: RefCell::new(script.into()),
            fallback: test_catalog(),
            fetches: Cell::new(0),
        }
    }
}

impl CatalogSource for ScriptedCatalog {
    fn fetch(&self) -> AppResult<Catalog> {
        self.fetches.set(self.fetches.get() + 1);
        match self.script.borrow_mut().pop_front() {
            Some(Some(catalog)) => Ok(catalog),
            Some(None) => Err(AppError::CatalogError("catalog.toml is locked".into())),
            None => Ok(self.fallback.clone()),
        }
    }
}

/// One element of the fake page.
#[derive(Debug, Clone, Default)]
pub struct Node {
    pub tag: &'static str,
    pub name: Option<String>,
    pub id: Option<String>,
    pub class: Option<String>,
    pub text: String,
    pub selected: bool,
    pub displayed: bool,
    pub parent: Option<usize>,
    pub inner_html: Option<String>,
    /// Clicking this node shows every descendant of the given node.
    pub expands: Option<usize>,
    /// Removed from the page: no lookup finds it.
    pub detached: bool,
}

impl Node {
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            displayed: true,
            ..Default::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    pub fn under(mut self, parent: usize) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// In-memory page implementing the driver commands over a node tree.
///
/// Clicking an `input` or `option` toggles its selection, like a browser does
/// for checkboxes and multi-select options.
#[derive(Debug, Default)]
pub struct FakePage {
    nodes: Vec<Node>,
    url: Option<String>,
    pending_alert: Option<String>,
    /// Every command except `quit`.
    pub calls: Rc<Cell<usize>>,
    pub clicks: Rc<Cell<usize>>,
    pub quits: Rc<Cell<usize>>,
    pub navigations: Rc<RefCell<Vec<String>>>,
    pub fail_navigate: bool,
    /// Dialog text raised when the launch button is clicked.
    pub alert_on_launch: Option<String>,
    /// (URL fragment, indicator code) pairs whose checkbox is missing.
    pub broken: Vec<(String, u32)>,
    /// Labels of elements whose click is rejected.
    pub unclickable: Vec<String>,
    /// Label of every successful click, in order.
    pub click_log: Rc<RefCell<Vec<String>>>,
    pub fail_setup: bool,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn add_checkbox(&mut self, name: &str, checked: bool) -> ElementRef {
        let index = self.add(Node::new("input").name(name).selected(checked));
        element_ref(index)
    }

    pub fn add_select(&mut self, name: &str, options: &[(&str, bool)]) -> ElementRef {
        let select = self.add(Node::new("select").name(name));
        for (label, selected) in options {
            self.add(
                Node::new("option")
                    .text(*label)
                    .selected(*selected)
                    .under(select),
            );
        }
        element_ref(select)
    }

    pub fn is_checked(&self, element: &ElementRef) -> bool {
        index_of(element)
            .and_then(|index| self.nodes.get(index))
            .map(|node| node.selected)
            .unwrap_or(false)
    }

    /// Labels of the selected options of a select element.
    pub fn selected_options(&self, select: &ElementRef) -> Vec<String> {
        let Some(select) = index_of(select) else {
            return Vec::new();
        };
        self.nodes
            .iter()
            .filter(|node| node.parent == Some(select) && node.selected)
            .map(|node| node.text.clone())
            .collect()
    }

    pub fn named(&self, name: &str) -> Option<ElementRef> {
        self.nodes
            .iter()
            .position(|node| node.name.as_deref() == Some(name))
            .map(element_ref)
    }

    pub fn call_count(&self) -> usize {
        self.calls.get()
    }

    /// Removes every element matching `locator` from the page.
    pub fn detach(&mut self, locator: &Locator) {
        for index in self.indexes(locator, None) {
            self.nodes[index].detached = true;
        }
    }

    /// Removes the `nth` element matching `locator` from the page.
    pub fn detach_nth(&mut self, locator: &Locator, nth: usize) {
        if let Some(index) = self.indexes(locator, None).into_iter().nth(nth) {
            self.nodes[index].detached = true;
        }
    }

    pub fn clicked(&self) -> Vec<String> {
        self.click_log.borrow().clone()
    }

    /// Name, id or text of a node, whichever comes first; the tag otherwise.
    fn label(node: &Node) -> String {
        node.name
            .clone()
            .or_else(|| node.id.clone())
            .or_else(|| (!node.text.is_empty()).then(|| node.text.clone()))
            .unwrap_or_else(|| node.tag.to_string())
    }

    fn tick(&self) {
        self.calls.set(self.calls.get() + 1);
    }

    fn node(&self, element: &ElementRef) -> DriverResult<&Node> {
        index_of(element)
            .and_then(|index| self.nodes.get(index))
            .ok_or_else(|| DriverError::NoSuchElement(format!("stale element {}", element.as_str())))
    }

    fn matches(&self, index: usize, locator: &Locator) -> bool {
        let node = &self.nodes[index];
        if node.detached {
            return false;
        }
        match locator {
            Locator::Name(name) => {
                if node.name.as_deref() != Some(name.as_str()) {
                    return false;
                }
                !self.is_broken(name)
            }
            Locator::Id(id) => node.id.as_deref() == Some(id.as_str()),
            Locator::ClassName(class) => node.class.as_deref() == Some(class.as_str()),
            Locator::TagName(tag) => node.tag == tag.as_str(),
            Locator::XPath(_) => false,
        }
    }

    fn is_broken(&self, name: &str) -> bool {
        let Some(url) = &self.url else {
            return false;
        };
        self.broken
            .iter()
            .any(|(fragment, code)| url.contains(fragment.as_str()) && code.to_string() == name)
    }

    fn is_descendant(&self, mut index: usize, ancestor: usize) -> bool {
        while let Some(parent) = self.nodes[index].parent {
            if parent == ancestor {
                return true;
            }
            index = parent;
        }
        false
    }

    fn indexes(&self, locator: &Locator, within: Option<usize>) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&index| within.map_or(true, |root| self.is_descendant(index, root)))
            .filter(|&index| self.matches(index, locator))
            .collect()
    }

    fn matching(&self, locator: &Locator, within: Option<usize>) -> Vec<ElementRef> {
        self.indexes(locator, within)
            .into_iter()
            .map(element_ref)
            .collect()
    }
}

fn element_ref(index: usize) -> ElementRef {
    ElementRef::new(index.to_string())
}

fn index_of(element: &ElementRef) -> Option<usize> {
    element.as_str().parse().ok()
}

impl PageDriver for FakePage {
    async fn navigate(&mut self, url: &str) -> DriverResult<()> {
        self.tick();
        self.navigations.borrow_mut().push(url.to_string());
        if self.fail_navigate {
            return Err(DriverError::Transport(format!("cannot reach {url}")));
        }
        self.url = Some(url.to_string());
        Ok(())
    }

    async fn find_element(&mut self, locator: &Locator) -> DriverResult<ElementRef> {
        self.tick();
        self.matching(locator, None)
            .into_iter()
            .next()
            .ok_or_else(|| DriverError::NoSuchElement(locator.to_string()))
    }

    async fn find_elements(&mut self, locator: &Locator) -> DriverResult<Vec<ElementRef>> {
        self.tick();
        Ok(self.matching(locator, None))
    }

    async fn find_child(
        &mut self,
        element: &ElementRef,
        locator: &Locator,
    ) -> DriverResult<ElementRef> {
        self.tick();
        if *locator == Locator::parent() {
            return self
                .node(element)?
                .parent
                .map(element_ref)
                .ok_or_else(|| DriverError::NoSuchElement(locator.to_string()));
        }
        let root = index_of(element);
        self.matching(locator, root)
            .into_iter()
            .next()
            .ok_or_else(|| DriverError::NoSuchElement(locator.to_string()))
    }

    async fn find_children(
        &mut self,
        element: &ElementRef,
        locator: &Locator,
    ) -> DriverResult<Vec<ElementRef>> {
        self.tick();
        self.node(element)?;
        Ok(self.matching(locator, index_of(element)))
    }

    async fn click(&mut self, element: &ElementRef) -> DriverResult<()> {
        self.tick();
        let node = self.node(element)?.clone();
        let label = Self::label(&node);
        if self.unclickable.contains(&label) {
            return Err(DriverError::Command {
                command: "click".into(),
                message: format!("element {label} is not interactable"),
            });
        }
        self.clicks.set(self.clicks.get() + 1);
        self.click_log.borrow_mut().push(label);
        if node.name.as_deref() == Some("STbl") {
            self.pending_alert = self.alert_on_launch.clone();
        }
        if let Some(folder) = node.expands {
            for index in 0..self.nodes.len() {
                if self.is_descendant(index, folder) {
                    self.nodes[index].displayed = true;
                }
            }
        }
        if let Some(index) = index_of(element) {
            if matches!(node.tag, "input" | "option") {
                self.nodes[index].selected = !node.selected;
            }
        }
        Ok(())
    }

    async fn attribute(
        &mut self,
        element: &ElementRef,
        name: &str,
    ) -> DriverResult<Option<String>> {
        self.tick();
        let node = self.node(element)?;
        Ok(match name {
            "class" => node.class.clone(),
            "id" => node.id.clone(),
            "name" => node.name.clone(),
            "innerHTML" => node.inner_html.clone(),
            _ => None,
        })
    }

    async fn text(&mut self, element: &ElementRef) -> DriverResult<String> {
        self.tick();
        Ok(self.node(element)?.text.clone())
    }

    async fn is_selected(&mut self, element: &ElementRef) -> DriverResult<bool> {
        self.tick();
        Ok(self.node(element)?.selected)
    }

    async fn is_displayed(&mut self, element: &ElementRef) -> DriverResult<bool> {
        self.tick();
        Ok(self.node(element)?.displayed)
    }

    async fn dismiss_alert(&mut self) -> DriverResult<Option<String>> {
        self.tick();
        Ok(self.pending_alert.take())
    }

    async fn switch_to_last_window(&mut self) -> DriverResult<()> {
        self.tick();
        Ok(())
    }

    async fn quit(self) -> DriverResult<()> {
        self.quits.set(self.quits.get() + 1);
        Ok(())
    }
}

impl SessionSetup for FakePage {
    async fn setup(&mut self) -> DriverResult<()> {
        if self.fail_setup {
            return Err(DriverError::Command {
                command: "new page".into(),
                message: "target crashed".into(),
            });
        }
        Ok(())
    }
}

/// A region page with every indicator in `codes` and the full query form.
///
/// With `collapsed`, each indicator checkbox sits hidden inside a folder list
/// `fold{n}x` whose toggle is `fold{n}`.
pub fn census_form(codes: &[u32], collapsed: bool) -> FakePage {
    let mut page = FakePage::new();

    for (n, code) in codes.iter().enumerate() {
        let toggle = page.add(Node::new("span").id(format!("fold{n}")));
        let mut list = Node::new("div").class("list").id(format!("fold{n}x"));
        let mut row = Node::new("div");
        let mut checkbox = Node::new("input").name(code.to_string());
        if collapsed {
            list = list.hidden();
            row = row.hidden();
            checkbox = checkbox.hidden();
        }
        let list = page.add(list);
        page.nodes[toggle].expands = Some(list);
        let row = page.add(row.under(list));
        page.add(checkbox.under(row));
    }

    page.add(Node::new("button").id("Knopka"));
    page.add(Node::new("input").id("Manual"));

    for (field, labels) in FORM_FIELDS {
        page.add(Node::new("input").name(format!("{field}_chk")));
        let options: Vec<(&str, bool)> = labels.iter().map(|label| (*label, false)).collect();
        page.add_select(field, &options);
        for _ in 0..3 {
            page.add(Node::new("input").name(format!("_{field}")));
        }
    }

    for field in ["munr", "tippos", "oktmo"] {
        page.add_select(&format!("a_{field}"), &[("1", false), ("2", false), ("3", false)]);
    }

    page.add(Node::new("button").name("STbl"));
    let mut table = Node::new("table").class("OutTbl");
    table.inner_html = Some(SAMPLE_TABLE.to_string());
    page.add(table);

    page
}

/// Opens a fresh [`census_form`] page per session and counts sessions.
#[derive(Debug, Default)]
pub struct FakeSessions {
    pub codes: Vec<u32>,
    pub broken: Vec<(String, u32)>,
    pub fail_open: bool,
    /// Sessions start but fail their setup.
    pub fail_setup: bool,
    pub alert_on_launch: Option<String>,
    pub opened: Rc<Cell<usize>>,
    pub quits: Rc<Cell<usize>>,
    pub navigations: Rc<RefCell<Vec<String>>>,
}

impl FakeSessions {
    pub fn new(codes: &[u32]) -> Self {
        Self {
            codes: codes.to_vec(),
            ..Default::default()
        }
    }
}

impl SessionFactory for FakeSessions {
    type Driver = FakePage;

    async fn open(&self) -> DriverResult<FakePage> {
        if self.fail_open {
            return Err(DriverError::Transport("connection refused".into()));
        }
        self.opened.set(self.opened.get() + 1);

        let mut page = census_form(&self.codes, true);
        page.broken = self.broken.clone();
        page.alert_on_launch = self.alert_on_launch.clone();
        page.quits = Rc::clone(&self.quits);
        page.navigations = Rc::clone(&self.navigations);
        page.fail_setup = self.fail_setup;
        start_session(page).await
    }
}

/// Keeps saved tables in memory; keys in `fail_keys` fail to save.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub saved: Vec<(String, String)>,
    pub fail_keys: Vec<String>,
}

impl OutputSink for MemorySink {
    async fn write(&mut self, key: &str, markup: &str) -> AppResult<()> {
        if self.fail_keys.iter().any(|k| k == key) {
            return Err(AppError::IoError(format!("disk full writing {key}")));
        }
        self.saved.push((key.to_string(), markup.to_string()));
        Ok(())
    }
}

/// Records every reporter callback.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub begun: Vec<usize>,
    pub reports: Vec<(String, String, Outcome)>,
    pub finished: Vec<BatchSummary>,
}

impl ProgressReporter for RecordingReporter {
    fn begin(&mut self, total: usize) {
        self.begun.push(total);
    }

    fn report(&mut self, region: &str, indicator: &str, outcome: &Outcome) {
        self.reports
            .push((region.to_string(), indicator.to_string(), outcome.clone()));
    }

    fn finish(&mut self, summary: &BatchSummary) {
        self.finished.push(summary.clone());
    }
}
