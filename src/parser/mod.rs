mod page_code;
mod spec_code;
#[cfg(test)]
mod tests;

pub use page_code::{
    PageCode, PageExtraction, PageStrategy, extract_anchored, extract_legacy,
    extract_page_codes, is_page_code_shape,
};
pub use spec_code::{
    CONFUSION_PAIRS, SPEC_CODE_PATTERN, SpecCode, VALID_SERIES_PREFIXES, contains_spec_code_shape,
    correct_confusions, extract_spec_code, is_spec_code, parse_spec_codes, validate_spec_code,
};
