//! CSS selectors for the gated fund site.
//!
//! Kept in one place so markup changes touch a single file.

pub const ACCEPT_ALL_BUTTON: &str = "#qc-cmp2-ui button[mode='primary']";
pub const COUNTRY_SELECTOR: &str = ".country-selector";
pub const INVESTOR_COUNTRY_BUTTON: &str = ".fund-market-type";
pub const PROFESSIONAL_INVESTOR_LABEL: &str = "label[for='professional']";
pub const TOS_CHECKBOX: &str = "label[for='fund-market-checkbox-mandatory'] span";
pub const CONFIRM_BUTTON: &str = ".btn.fundmarket-btn.confirm";
pub const SEARCH_INPUT_CONTAINER: &str = ".input-container";
pub const SEARCH_INPUT: &str = ".input-container input";
pub const SEARCH_BUTTON: &str = "button[type='submit']";
pub const RESULT_ROW: &str = "ul.list div[data-name='MR']";
pub const NOT_MEMBER_ROW: &str = "ul.list li.not-member";
pub const PDF_LINK: &str = "ul.list div[data-name='MR'] li a.fancybox";

/// Selector for one country entry in the jurisdiction picker.
pub fn country_item(country_code: &str) -> String {
    format!(".countryItem[data-cc='{country_code}']")
}
