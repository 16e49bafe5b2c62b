use super::*;
use crate::config::PageCodeConfig;
use crate::fragment::TextFragment;
use crate::geometry::GeometryCalculator;

fn fragment(text: &str, confidence: f64, x: f64, y: f64, width: f64, height: f64) -> TextFragment {
    TextFragment::from_rect(text, confidence, x, y, width, height)
}

fn single(text: &str) -> Vec<TextFragment> {
    vec![fragment(text, 0.95, 0.0, 0.0, 100.0, 50.0)]
}

fn pages_of(extraction: &PageExtraction) -> Vec<&str> {
    extraction
        .codes()
        .iter()
        .map(|code| code.page.as_str())
        .collect()
}

#[test]
fn grammar_matches_round_trip_through_the_parser() {
    let texts = [
        "12J2", "20G908-1", "23J908-8", "06J908-1", "L13J8", "L13J5-1", "05ZJ001", "16G101-1",
        "22 J 403-1",
    ];

    for text in texts {
        let codes = parse_spec_codes(&single(text));
        assert_eq!(codes.len(), 1, "expected exactly one code for {text}");

        let code = &codes[0].code;
        assert!(is_spec_code(code), "{code} should re-match the grammar");

        let reparsed = parse_spec_codes(&single(code));
        assert_eq!(reparsed.len(), 1);
        assert_eq!(&reparsed[0].code, code);
    }
}

#[test]
fn spec_codes_are_normalized_from_surrounding_text() {
    assert_eq!(extract_spec_code("见 12j2 图集").as_deref(), Some("12J2"));
    assert_eq!(extract_spec_code("22 J 403-1").as_deref(), Some("22J403-1"));
    assert_eq!(extract_spec_code("L13J5-1").as_deref(), Some("L13J5-1"));
}

#[test]
fn validation_rejects_unknown_series_and_bad_lengths() {
    assert!(validate_spec_code("12J2"));
    assert!(validate_spec_code("L13J8"));
    assert!(!validate_spec_code("99J2"));
    assert!(!validate_spec_code("30G5"));
    assert!(!validate_spec_code("12J"));
    assert!(!validate_spec_code("1234"));
    assert!(!validate_spec_code("12J123456789-123"));

    assert_eq!(extract_spec_code("99J2"), None);
    assert_eq!(extract_spec_code("300G5"), None);
    assert_eq!(extract_spec_code("C11"), None);
    assert_eq!(extract_spec_code("1282"), None);
}

#[test]
fn confusion_table_substitutes_in_both_directions() {
    for &(digit, letter) in CONFUSION_PAIRS {
        // letter misread inside the numeric series block
        let (block, expected_block) = match digit {
            '0' => (format!("{letter}6"), "06".to_string()),
            '5' => (format!("1{letter}"), "15".to_string()),
            '8' => (format!("0{letter}"), "08".to_string()),
            _ => (format!("{letter}2"), format!("{digit}2")),
        };
        assert!(VALID_SERIES_PREFIXES.contains(&expected_block.as_str()));
        assert_eq!(
            correct_confusions(&format!("{block}J2")),
            Some(format!("{expected_block}J2")),
            "letter {letter} should read as digit {digit}"
        );

        // digit misread at the series letter position
        assert_eq!(
            correct_confusions(&format!("L12{digit}2")),
            Some(format!("L12{letter}2")),
            "digit {digit} should read as letter {letter}"
        );
    }
}

#[test]
fn correction_recovers_noisy_codes_and_leaves_plain_numbers_alone() {
    assert_eq!(extract_spec_code("I2J2").as_deref(), Some("12J2"));
    assert_eq!(extract_spec_code("2OG9O8-1").as_deref(), Some("20G908-1"));
    assert_eq!(extract_spec_code("12-J2").as_deref(), Some("12J2"));
    assert_eq!(extract_spec_code("L1 3J8").as_deref(), Some("L13J8"));
    assert_eq!(extract_spec_code("12_J.2").as_deref(), Some("12J2"));

    assert_eq!(correct_confusions("1282"), None);
    assert_eq!(correct_confusions("1200-2"), None);
    assert_eq!(correct_confusions("C11"), None);
    assert_eq!(correct_confusions("NOTE"), None);
    assert_eq!(correct_confusions("OSB1"), None);
    assert_eq!(correct_confusions("ISB2"), None);
}

#[test]
fn duplicate_spec_codes_keep_highest_confidence() {
    let fragments = vec![
        fragment("12J2", 0.70, 0.0, 0.0, 60.0, 20.0),
        fragment("C11", 0.90, 80.0, 0.0, 30.0, 20.0),
        fragment("12 J2", 0.92, 0.0, 300.0, 60.0, 20.0),
        fragment("20G908-1", 0.80, 0.0, 600.0, 80.0, 20.0),
    ];

    let codes = parse_spec_codes(&fragments);
    assert_eq!(codes.len(), 2);
    assert_eq!(codes[0].code, "12J2");
    assert_eq!(codes[0].confidence, 0.92);
    assert_eq!(codes[0].source_index, 2);
    assert_eq!(codes[0].source_text, "12 J2");
    assert_eq!(codes[1].code, "20G908-1");
}

#[test]
fn degenerate_fragments_contribute_nothing() {
    let fragments = vec![
        TextFragment::new("12J2", 0.9, [(10.0, 10.0); 4]),
        fragment("20G908-1", 0.9, 0.0, 0.0, 80.0, 20.0),
    ];

    let codes = parse_spec_codes(&fragments);
    assert_eq!(codes.len(), 1);
    assert_eq!(codes[0].code, "20G908-1");
    assert_eq!(codes[0].source_index, 1);
}

#[test]
fn inline_page_code_right_of_anchor_is_chosen() {
    let fragments = vec![
        fragment("12J2", 0.95, 100.0, 100.0, 60.0, 30.0),
        fragment("C11", 0.90, 180.0, 100.0, 40.0, 30.0),
        fragment("说明", 0.99, 180.0, 200.0, 40.0, 30.0),
    ];

    let extraction = extract_page_codes(
        &fragments,
        &PageCodeConfig::default(),
        &GeometryCalculator::default(),
    );
    assert_eq!(extraction.strategy(), PageStrategy::Anchored);
    assert_eq!(
        extraction.codes(),
        &[PageCode {
            page: "C11".to_string(),
            confidence: 0.90,
            source_indices: vec![0, 1],
        }]
    );
}

#[test]
fn page_code_in_the_anchor_run_is_taken_at_distance_zero() {
    for text in ["12J2 C11", "12J2-C11", "12j2，c11", "12J2 / C11"] {
        let fragments = vec![
            fragment(text, 0.95, 100.0, 100.0, 120.0, 30.0),
            fragment("C12", 0.90, 240.0, 100.0, 40.0, 30.0),
        ];

        let extraction = extract_page_codes(
            &fragments,
            &PageCodeConfig::default(),
            &GeometryCalculator::default(),
        );
        assert_eq!(extraction.strategy(), PageStrategy::Anchored);
        assert_eq!(
            extraction.codes(),
            &[PageCode {
                page: "C11".to_string(),
                confidence: 0.95,
                source_indices: vec![0],
            }],
            "run {text:?}"
        );
    }
}

#[test]
fn anchor_run_tail_passes_the_same_candidate_filters() {
    let config = PageCodeConfig::default();
    let geometry = GeometryCalculator::default();

    // spacing ends the code at "12J2", and a four-digit tail is a dimension
    assert!(extract_anchored(&single("12J2 1200"), &config, &geometry).is_empty());
    assert!(extract_anchored(&single("12J2 图集"), &config, &geometry).is_empty());
    assert!(extract_anchored(&single("20G908-1"), &config, &geometry).is_empty());

    let faint = vec![fragment("12J2 C11", 0.40, 0.0, 0.0, 100.0, 50.0)];
    assert!(extract_anchored(&faint, &config, &geometry).is_empty());

    let pages = extract_anchored(&single("12J2 11"), &config, &geometry);
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].page, "11");
}

#[test]
fn zero_area_page_fragment_is_ignored() {
    let fragments = vec![
        fragment("12J2", 0.95, 100.0, 100.0, 60.0, 30.0),
        TextFragment::new(
            "C11",
            0.90,
            [(180.0, 100.0), (220.0, 100.0), (220.0, 100.0), (180.0, 100.0)],
        ),
    ];

    let extraction = extract_page_codes(
        &fragments,
        &PageCodeConfig::default(),
        &GeometryCalculator::default(),
    );
    assert!(
        extraction.codes().is_empty(),
        "unexpected pages: {extraction:?}"
    );
}

#[test]
fn vertically_stacked_candidates_pick_the_lower_one_regardless_of_score() {
    // "1" is closer and more confident; the stack rule still takes the lower "20".
    let fragments = vec![
        fragment("20G908-1", 0.90, 100.0, 100.0, 120.0, 30.0),
        fragment("1", 0.99, 150.0, 60.0, 20.0, 20.0),
        fragment("20", 0.60, 148.0, 170.0, 24.0, 20.0),
    ];

    let extraction = extract_anchored(
        &fragments,
        &PageCodeConfig::default(),
        &GeometryCalculator::default(),
    );
    assert_eq!(extraction.len(), 1);
    assert_eq!(extraction[0].page, "20");
    assert_eq!(extraction[0].source_indices, vec![0, 2]);
}

// Anchor centered at (160, 115) with two page candidates below it; the upper one at
// (160, 140) always has the better score.
fn stacked_pair(lower_x: f64, lower_y: f64) -> Vec<TextFragment> {
    vec![
        fragment("20G908-1", 0.90, 100.0, 100.0, 120.0, 30.0),
        fragment("1", 0.90, 150.0, 130.0, 20.0, 20.0),
        fragment("20", 0.90, lower_x - 12.0, lower_y - 10.0, 24.0, 20.0),
    ]
}

fn chosen_page(fragments: &[TextFragment], config: &PageCodeConfig) -> String {
    let pages = extract_anchored(fragments, config, &GeometryCalculator::default());
    assert_eq!(pages.len(), 1, "expected one page, got {pages:?}");
    pages[0].page.clone()
}

#[test]
fn stack_rule_needs_vertical_offset_strictly_above_threshold() {
    let config = PageCodeConfig::default();
    assert_eq!(chosen_page(&stacked_pair(160.0, 165.0), &config), "1");
    assert_eq!(chosen_page(&stacked_pair(160.0, 166.0), &config), "20");
}

#[test]
fn stack_rule_needs_horizontal_offset_strictly_below_threshold() {
    let config = PageCodeConfig::default();
    assert_eq!(chosen_page(&stacked_pair(178.0, 170.0), &config), "1");
    assert_eq!(chosen_page(&stacked_pair(177.0, 170.0), &config), "20");
}

#[test]
fn stack_thresholds_follow_configuration() {
    let wide_dx = PageCodeConfig {
        stack_max_dx: 20.0,
        ..PageCodeConfig::default()
    };
    assert_eq!(chosen_page(&stacked_pair(178.0, 170.0), &wide_dx), "20");

    let short_dy = PageCodeConfig {
        stack_min_dy: 20.0,
        ..PageCodeConfig::default()
    };
    assert_eq!(chosen_page(&stacked_pair(160.0, 165.0), &short_dy), "20");

    let disabled = PageCodeConfig {
        stack_max_dx: 0.0,
        ..PageCodeConfig::default()
    };
    assert_eq!(chosen_page(&stacked_pair(160.0, 170.0), &disabled), "1");
}

#[test]
fn candidate_exactly_at_search_radius_is_kept() {
    let config = PageCodeConfig::default();
    let geometry = GeometryCalculator::default();
    // anchor center (130, 115); C7 centers at x = 280 and x = 281
    let at_radius = vec![
        fragment("12J2", 0.95, 100.0, 100.0, 60.0, 30.0),
        fragment("C7", 0.95, 265.0, 100.0, 30.0, 30.0),
    ];
    let pages = extract_anchored(&at_radius, &config, &geometry);
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].page, "C7");

    let past_radius = vec![
        fragment("12J2", 0.95, 100.0, 100.0, 60.0, 30.0),
        fragment("C7", 0.95, 266.0, 100.0, 30.0, 30.0),
    ];
    assert!(extract_anchored(&past_radius, &config, &geometry).is_empty());
}

#[test]
fn side_by_side_candidates_fall_back_to_best_score() {
    let fragments = vec![
        fragment("12J2", 0.95, 100.0, 100.0, 60.0, 30.0),
        fragment("C11", 0.90, 200.0, 100.0, 30.0, 30.0),
        fragment("C12", 0.90, 160.0, 150.0, 30.0, 30.0),
    ];

    let extraction = extract_anchored(
        &fragments,
        &PageCodeConfig::default(),
        &GeometryCalculator::default(),
    );
    assert_eq!(extraction.len(), 1);
    assert_eq!(extraction[0].page, "C12");
}

#[test]
fn candidate_filters_reject_codes_dimensions_faint_and_distant_text() {
    let fragments = vec![
        fragment("12J2", 0.95, 100.0, 100.0, 60.0, 30.0),
        fragment("13J8", 0.95, 170.0, 100.0, 40.0, 30.0),
        fragment("1200", 0.95, 100.0, 140.0, 40.0, 30.0),
        fragment("C3", 0.30, 60.0, 100.0, 30.0, 30.0),
        fragment("C7", 0.95, 600.0, 100.0, 30.0, 30.0),
        fragment("C11-2", 0.95, 100.0, 60.0, 50.0, 30.0),
    ];

    let extraction = extract_anchored(
        &fragments,
        &PageCodeConfig::default(),
        &GeometryCalculator::default(),
    );
    assert!(extraction.is_empty(), "unexpected pages: {extraction:?}");
}

#[test]
fn search_radius_is_configurable() {
    let fragments = vec![
        fragment("12J2", 0.95, 100.0, 100.0, 60.0, 30.0),
        fragment("C7", 0.95, 330.0, 100.0, 30.0, 30.0),
    ];
    let geometry = GeometryCalculator::default();

    assert!(extract_anchored(&fragments, &PageCodeConfig::default(), &geometry).is_empty());

    let wide = PageCodeConfig {
        search_radius: 250.0,
        ..PageCodeConfig::default()
    };
    let pages = extract_anchored(&fragments, &wide, &geometry);
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].page, "C7");
}

#[test]
fn legacy_extractor_runs_when_no_anchor_engages() {
    let fragments = vec![
        fragment("11", 0.85, 100.0, 100.0, 30.0, 30.0),
        fragment("5", 0.90, 200.0, 100.0, 20.0, 30.0),
        fragment("123", 0.75, 300.0, 100.0, 40.0, 30.0),
        fragment("c11", 0.88, 100.0, 200.0, 40.0, 30.0),
        fragment("P5", 0.92, 200.0, 200.0, 30.0, 30.0),
        fragment("建筑", 0.95, 400.0, 100.0, 50.0, 30.0),
        fragment("ABC", 0.80, 500.0, 100.0, 40.0, 30.0),
        fragment("7", 0.60, 600.0, 100.0, 20.0, 30.0),
        fragment("C11", 0.70, 700.0, 100.0, 40.0, 30.0),
    ];

    let extraction = extract_page_codes(
        &fragments,
        &PageCodeConfig::default(),
        &GeometryCalculator::default(),
    );
    assert_eq!(extraction.strategy(), PageStrategy::Legacy);
    assert_eq!(pages_of(&extraction), vec!["11", "5", "123", "C11", "P5"]);

    let c11 = &extraction.codes()[3];
    assert_eq!(c11.confidence, 0.88);
    assert_eq!(c11.source_indices, vec![3]);
}

#[test]
fn dashed_page_codes_are_a_known_gap_of_both_extractors() {
    assert!(is_page_code_shape("C11"));
    assert!(is_page_code_shape("11"));
    assert!(!is_page_code_shape("C11-2"));
    assert!(!is_page_code_shape("1-11"));

    let fragments = vec![fragment("C11-2", 0.95, 0.0, 0.0, 50.0, 30.0)];
    assert!(extract_legacy(&fragments, &PageCodeConfig::default()).is_empty());
}
