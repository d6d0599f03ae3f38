use drugmap::model::DrugItem;
use drugmap::parse::{
    build_categories, extract_category_counts, extract_summary, parse_table, parse_title,
    split_sections,
};
use drugmap::text::{build_slug, file_slug, normalize_text};
use spectral::assert_that;
use spectral::boolean::BooleanAssertions;
use std::collections::HashMap;

fn item(brand: &str, generic: &str, short: &str, full: &str) -> DrugItem {
    DrugItem {
        brand_name: brand.to_string(),
        generic_name: generic.to_string(),
        manufacturer_short: short.to_string(),
        manufacturer_full: full.to_string(),
        image: String::new(),
    }
}

#[test]
fn table_with_one_row_yields_one_item() {
    let body = "| A | B | C | D |\n| --- | --- | --- | --- |\n| X | Y | Z | W |\n";

    assert_that(&parse_table(body)).is_equal_to(vec![item("X", "Y", "Z", "W")]);
}

#[test]
fn section_without_table_has_no_items() {
    assert_that(&parse_table("\nNo drugs listed yet.\n").is_empty()).is_true();
}

#[test]
fn header_without_rows_has_no_items() {
    let body = "| A | B | C | D |\n| --- | --- | --- | --- |\n";

    assert_that(&parse_table(body).is_empty()).is_true();
}

#[test]
fn collection_stops_at_first_non_table_line() {
    let body = "intro\n\n| A | B | C | D |\n|---|---|---|---|\n| X | Y | Z | W |\nafter\n| Q | R | S | T |\n";

    assert_that(&parse_table(body)).is_equal_to(vec![item("X", "Y", "Z", "W")]);
}

#[test]
fn short_rows_are_padded_and_long_rows_truncated() {
    let body = "| A | B | C | D |\n|---|---|---|---|\n| X | Y |\n| 1 | 2 | 3 | 4 | 5 |\n| |\n";

    assert_that(&parse_table(body)).is_equal_to(vec![
        item("X", "Y", "", ""),
        item("1", "2", "3", "4"),
    ]);
}

#[test]
fn cells_are_normalized() {
    let body = "| A | B | C | D |\n|---|---|---|---|\n|  \u{feff}X  | Y\t| Z | W |\n";

    assert_that(&parse_table(body)).is_equal_to(vec![item("X", "Y", "Z", "W")]);
}

#[test]
fn category_counts_stop_at_unrelated_line() {
    let lines = ["药品分类及数量", "- 心血管：12", "- 呼吸：5", "next unrelated line", "- 肿瘤：3"];

    let mut expected: HashMap<String, usize> = HashMap::new();
    expected.insert("心血管".to_string(), 12);
    expected.insert("呼吸".to_string(), 5);

    assert_that(&extract_category_counts(&lines)).is_equal_to(expected);
}

#[test]
fn category_counts_skip_malformed_bullets() {
    let lines = ["## 药品分类及数量", "- 心血管：12"];
    assert_that(&extract_category_counts(&lines).is_empty()).is_true();

    let lines = ["药品分类及数量", "- 没有数量", "- 呼吸： 5 种"];
    let mut expected: HashMap<String, usize> = HashMap::new();
    expected.insert("呼吸".to_string(), 5);
    assert_that(&extract_category_counts(&lines)).is_equal_to(expected);
}

#[test]
fn category_counts_without_heading_are_empty() {
    let lines = ["- 心血管：12"];

    assert_that(&extract_category_counts(&lines).is_empty()).is_true();
}

#[test]
fn summary_strips_prefixes_and_full_stop() {
    let lines = [
        "# 标题",
        "\u{feff}- 已收录约 300 种原研药。",
        "- 统计截止时间：2024年5月。",
        "- 数据来源：国家药监局",
    ];

    let summary = extract_summary(&lines);

    assert_that(&summary.total).is_equal_to("300 种原研药".to_string());
    assert_that(&summary.last_updated).is_equal_to("2024年5月".to_string());
    assert_that(&summary.source).is_equal_to("国家药监局".to_string());
}

#[test]
fn missing_summary_lines_are_empty() {
    let summary = extract_summary(&["# Title", "- something else"]);

    assert_that(&summary.total).is_equal_to(String::new());
    assert_that(&summary.last_updated).is_equal_to(String::new());
    assert_that(&summary.source).is_equal_to(String::new());
}

#[test]
fn title_drops_heading_marker() {
    assert_that(&parse_title(&["\u{feff}#  原研药清单 ", "rest"])).is_equal_to("原研药清单".to_string());
    assert_that(&parse_title::<&str>(&[])).is_equal_to(String::new());
}

#[test]
fn sections_split_on_level_two_headings() {
    let sections = split_sections("# T\nintro\n## 心血管\nbody one\n### 小节\n## 呼吸");

    assert_that(&sections.len()).is_equal_to(2_usize);
    assert_that(&sections[0].heading).is_equal_to("心血管".to_string());
    assert_that(&sections[0].body).is_equal_to("body one\n### 小节".to_string());
    assert_that(&sections[1].heading).is_equal_to("呼吸".to_string());
    assert_that(&sections[1].body).is_equal_to(String::new());
}

#[test]
fn declared_count_wins_over_item_count() {
    let markdown = "# T\n## 心血管\n| a | b | c | d |\n|---|---|---|---|\n| X | Y | Z | W |\n## 呼吸\nnothing";
    let mut counts = HashMap::new();
    counts.insert("心血管".to_string(), 12);

    let categories = build_categories(markdown, &counts);

    assert_that(&categories.len()).is_equal_to(2_usize);
    assert_that(&categories[0].count).is_equal_to(12_usize);
    assert_that(&categories[0].items.len()).is_equal_to(1_usize);
    assert_that(&categories[1].count).is_equal_to(0_usize);
    assert_that(&categories[1].slug).is_equal_to("呼吸".to_string());
}

#[test]
fn slug_is_lowercase_and_dashed() {
    assert_that(&build_slug("  Anti Cancer  Drugs ")).is_equal_to("anti-cancer-drugs".to_string());
    assert_that(&build_slug("抗肿瘤 (Oncology)")).is_equal_to("抗肿瘤-oncology".to_string());
    assert_that(&build_slug("心血管/代谢")).is_equal_to("心血管代谢".to_string());
}

#[test]
fn slug_is_deterministic() {
    let name = "呼吸 Drugs\u{feff}";

    assert_that(&build_slug(name)).is_equal_to(build_slug(name));
}

#[test]
fn normalize_removes_bom_and_whitespace() {
    assert_that(&normalize_text("\u{feff}  text \u{feff}\n")).is_equal_to("text".to_string());
}

#[test]
fn file_slug_falls_back_to_item() {
    assert_that(&file_slug("Lipitor - 阿托伐他汀")).is_equal_to("lipitor-阿托伐他汀".to_string());
    assert_that(&file_slug("  ???  ")).is_equal_to("item".to_string());
}

#[test]
fn category_counts_read_ascii_digits_only() {
    let lines = ["药品分类及数量", "- 呼吸：12３", "- 肿瘤：３"];

    let mut expected: HashMap<String, usize> = HashMap::new();
    expected.insert("呼吸".to_string(), 12);

    assert_that(&extract_category_counts(&lines)).is_equal_to(expected);
}
