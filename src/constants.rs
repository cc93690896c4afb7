// Data source URLs
pub const MUNST_BASE_URL: &str = "https://rosstat.gov.ru/dbscripts/munst/munst{region}/DBInet.cgi";
pub const REGION_PLACEHOLDER: &str = "{region}";

// Template markers
pub const WILDCARD: &str = "*";
pub const AVAILABLE_KEY: &str = "available";
pub const AVAILABLE_YES: &str = "yes";

// Region help text
pub const REGION_HELP_TEXT: &str = "Region OK2 code (two digits, e.g., 01)";
pub const REGION_CODE_PATTERN: &str = r"^\d{2}$";

// Form element names on the municipal database page
pub const FOLDER_CLASS: &str = "list";
pub const FORM_BUTTON_ID: &str = "Knopka";
pub const MANUAL_LAYOUT_ID: &str = "Manual";
pub const LAUNCH_BUTTON_NAME: &str = "STbl";
pub const OUTPUT_TABLE_CLASS: &str = "OutTbl";
pub const CHECKBOX_SUFFIX: &str = "_chk";
pub const MANUAL_ORDER_PREFIX: &str = "_";
pub const COLUMN_ORDER_PREFIX: &str = "a_";

/// Breakdown columns forced into a fixed order by the manual layout step,
/// paired with the position label selected for each.
pub const FIXED_COLUMN_ORDER: [(&str, &str); 3] = [("munr", "1"), ("tippos", "2"), ("oktmo", "3")];

/// Upper bound on ancestors visited while looking for an indicator's folder.
pub const MAX_FOLDER_DEPTH: usize = 32;

// Bundled catalog
pub const BUNDLED_CATALOG: &str = include_str!("../catalog.toml");
