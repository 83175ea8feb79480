use ls_report::builder::render_report;
use ls_report::chart::ChartGenerator;
use ls_report::config::{ChartOptions, LayoutOptions};
use ls_report::fonts::{self, FontSet};
use ls_report::record::{DimensionScores, PoleMagnitudes, RespondentRecord};
use ls_report::template::build_report;
use sha2::{Digest, Sha256};

const SKIP_HINT: &str = "fonts missing. Set LS_REPORT_FONTS_DIR or copy assets/fonts next to the binary.";

fn sample_record() -> RespondentRecord {
    let scores = DimensionScores {
        active_reflective: -11,
        sensing_intuitive: 5,
        visual_verbal: 0,
        sequential_global: 9,
    };
    let magnitudes = PoleMagnitudes {
        active: 11,
        visual: 6,
        ..PoleMagnitudes::default()
    };
    RespondentRecord::new("1", "282412244", "张三", scores, magnitudes)
}

fn load_fonts() -> Option<FontSet> {
    if !fonts::fonts_available(None) {
        return None;
    }
    Some(FontSet::load(None).expect("load fonts"))
}

fn render_sample(fonts: &FontSet) -> ls_report::builder::RenderedReport {
    let record = sample_record();
    let chart = ChartGenerator::new(ChartOptions::default(), fonts.body_regular_bytes())
        .expect("chart generator")
        .render(record.magnitudes())
        .expect("render chart");
    let document = build_report(&record, chart, None);
    render_report(&document, fonts, &LayoutOptions::default()).expect("render report")
}

fn scrub_pdf(bytes: &[u8]) -> Vec<u8> {
    fn scrub_segment(data: &mut [u8], tag: &[u8], terminator: u8) {
        let mut index = 0;
        while index + tag.len() < data.len() {
            if data[index..].starts_with(tag) {
                let mut cursor = index + tag.len();
                while cursor < data.len() {
                    let byte = data[cursor];
                    if byte == terminator {
                        break;
                    }
                    if terminator == b')' {
                        data[cursor] = b'0';
                    } else if !matches!(byte, b'<' | b'>' | b' ' | b'\n' | b'\r' | b'\t') {
                        data[cursor] = b'0';
                    }
                    cursor += 1;
                }
                index = cursor;
            } else {
                index += 1;
            }
        }
    }

    fn scrub_xml(data: &mut [u8], start: &[u8], end: &[u8]) {
        let mut offset = 0;
        while offset + start.len() < data.len() {
            if let Some(start_pos) = data[offset..]
                .windows(start.len())
                .position(|window| window == start)
            {
                let start_index = offset + start_pos + start.len();
                if let Some(end_pos) = data[start_index..]
                    .windows(end.len())
                    .position(|window| window == end)
                {
                    for byte in &mut data[start_index..start_index + end_pos] {
                        if !matches!(*byte, b'<' | b'>' | b'/' | b' ' | b'\n' | b'\r' | b'\t') {
                            *byte = b'0';
                        }
                    }
                    offset = start_index + end_pos + end.len();
                } else {
                    break;
                }
            } else {
                break;
            }
        }
    }

    let mut normalized = bytes.to_vec();
    scrub_segment(&mut normalized, b"/CreationDate(", b')');
    scrub_segment(&mut normalized, b"/ModDate(", b')');
    scrub_segment(&mut normalized, b"/ID[", b']');
    scrub_segment(&mut normalized, b"/Producer(", b')');
    scrub_xml(&mut normalized, b"<xmp:CreateDate>", b"</xmp:CreateDate>");
    scrub_xml(&mut normalized, b"<xmp:ModifyDate>", b"</xmp:ModifyDate>");
    scrub_xml(
        &mut normalized,
        b"<xmp:MetadataDate>",
        b"</xmp:MetadataDate>",
    );
    scrub_xml(
        &mut normalized,
        b"<xmpMM:DocumentID>",
        b"</xmpMM:DocumentID>",
    );
    scrub_xml(
        &mut normalized,
        b"<xmpMM:InstanceID>",
        b"</xmpMM:InstanceID>",
    );
    scrub_xml(&mut normalized, b"<xmpMM:VersionID>", b"</xmpMM:VersionID>");
    normalized
}

fn normalized_hash(bytes: &[u8]) -> [u8; 32] {
    let normalized = scrub_pdf(bytes);
    let digest = Sha256::digest(&normalized);
    digest.into()
}

#[test]
fn renders_non_empty_output() {
    let Some(fonts) = load_fonts() else {
        eprintln!("Skipping renders_non_empty_output: {SKIP_HINT}");
        return;
    };
    let rendered = render_sample(&fonts);
    assert!(rendered.bytes.starts_with(b"%PDF-"));
}

#[test]
fn rendering_is_deterministic() {
    let Some(fonts) = load_fonts() else {
        eprintln!("Skipping rendering_is_deterministic: {SKIP_HINT}");
        return;
    };
    let bytes_a = render_sample(&fonts).bytes;
    let bytes_b = render_sample(&fonts).bytes;

    assert_eq!(bytes_a.len(), bytes_b.len(), "PDF sizes should match");
    assert_eq!(
        normalized_hash(&bytes_a),
        normalized_hash(&bytes_b),
        "PDF renders must be deterministic after metadata normalization"
    );
}

#[test]
fn headings_are_laid_out_in_page_order() {
    let Some(fonts) = load_fonts() else {
        eprintln!("Skipping headings_are_laid_out_in_page_order: {SKIP_HINT}");
        return;
    };
    let rendered = render_sample(&fonts);
    let titles: Vec<_> = rendered.headings.iter().map(|h| h.text.as_str()).collect();
    assert_eq!(
        titles,
        ["张三学习风格报告", "1 总览", "2 学习风格维度", "3 推荐学习策略"]
    );
    assert_eq!(rendered.headings[0].page, Some(1));

    let pages: Vec<usize> = rendered
        .headings
        .iter()
        .map(|h| h.page.expect("every heading is rendered"))
        .collect();
    assert!(pages.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[cfg(feature = "bookmarks")]
#[test]
fn level_one_headings_become_outline_entries() {
    let Some(fonts) = load_fonts() else {
        eprintln!("Skipping level_one_headings_become_outline_entries: {SKIP_HINT}");
        return;
    };
    let rendered = render_sample(&fonts);
    let document = lopdf::Document::load_mem(&rendered.bytes).expect("parse rendered pdf");
    let pages: Vec<_> = document.get_pages().into_values().collect();

    let catalog = document.catalog().expect("catalog");
    assert_eq!(
        catalog.get(b"PageMode").and_then(|mode| mode.as_name()).expect("page mode"),
        b"UseOutlines"
    );
    let outlines_id = catalog
        .get(b"Outlines")
        .and_then(|outlines| outlines.as_reference())
        .expect("outlines reference");
    let outlines = document.get_dictionary(outlines_id).expect("outlines");
    assert_eq!(outlines.get(b"Count").and_then(|c| c.as_i64()).expect("count"), 3);

    let mut titles = Vec::new();
    let mut next = outlines.get(b"First").and_then(|first| first.as_reference()).ok();
    while let Some(id) = next {
        let entry = document.get_dictionary(id).expect("outline entry");
        let title = entry.get(b"Title").and_then(|t| t.as_str()).expect("title");
        let units: Vec<u16> = title[2..]
            .chunks(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        titles.push(String::from_utf16(&units).expect("utf-16 title"));

        let dest = entry.get(b"Dest").and_then(|d| d.as_array()).expect("dest");
        let page = dest[0].as_reference().expect("page reference");
        assert!(pages.contains(&page));

        next = entry.get(b"Next").and_then(|n| n.as_reference()).ok();
    }
    assert_eq!(titles, ["1 总览", "2 学习风格维度", "3 推荐学习策略"]);
}
