/*!
 * Segmenter tests: grouping under a budget, atomic span protection and
 * exact content conservation.
 */

use yadtwai::anchor::{AnchorCodec, ExtractionProfile};
use yadtwai::markup::parse_document;
use yadtwai::segmenter::{chunk_text, group_blocks};

fn blocks_from(source: &str) -> Vec<yadtwai::anchor::Block> {
    let doc = parse_document(source).unwrap();
    AnchorCodec::extract_blocks(&doc, ExtractionProfile::Epub).unwrap()
}

#[test]
fn test_groupBlocks_withManyParagraphs_shouldRespectBudget() {
    let paragraphs: String = (0..30)
        .map(|i| format!("<p>Paragraph number {} with some filler text.</p>", i))
        .collect();
    let blocks = blocks_from(&format!("<div>{}</div>", paragraphs));
    assert_eq!(blocks.len(), 30);

    let groups = group_blocks(&blocks, 200);

    // Every block lands in exactly one group, in order
    let flattened: Vec<usize> = groups.iter().flat_map(|g| g.block_indices.clone()).collect();
    assert_eq!(flattened, (0..30).collect::<Vec<_>>());

    // No group except possibly a single-block one exceeds the budget
    for group in &groups {
        let size: usize = group
            .block_indices
            .iter()
            .map(|&i| blocks[i].char_size)
            .sum();
        assert!(size <= 200 || group.block_indices.len() == 1);
    }
}

#[test]
fn test_groupBlocks_withOversizedBlock_shouldNeverSplitIt() {
    let big = "x".repeat(5000);
    let blocks = blocks_from(&format!("<div><p>small</p><p>{}</p><p>tail</p></div>", big));

    let groups = group_blocks(&blocks, 100);

    // The oversized block forms its own group, unsplit
    let oversized_group = groups
        .iter()
        .find(|g| g.block_indices.contains(&1))
        .unwrap();
    assert_eq!(oversized_group.block_indices, vec![1]);
    assert!(oversized_group.original_text.contains(&big));
}

#[test]
fn test_chunkText_contentConservation_overManyBudgets() {
    let text = "Intro paragraph.\n\n<p>HTML block one.</p><p>HTML block two.</p>\n\n\
                A much longer markdown paragraph that rambles on well past any small budget \
                without containing a single boundary of its own.\n\nOutro.";

    for budget in [1, 25, 60, 120, 100_000] {
        let chunks = chunk_text(text, budget);
        assert_eq!(chunks.concat(), text, "conservation failed at budget {budget}");
    }
}

#[test]
fn test_chunkText_withTableBiggerThanBudget_shouldKeepSpanAtomic() {
    let rows: String = (0..40)
        .map(|i| format!("<tr><td>row {} col a</td><td>row {} col b</td></tr>", i, i))
        .collect();
    let table = format!("<table>{}</table>", rows);
    let text = format!("<p>lead-in</p>{}<p>lead-out</p>", table);

    let chunks = chunk_text(&text, 64);

    assert_eq!(chunks.concat(), text);
    // The table never straddles a chunk boundary
    let carrier: Vec<&String> = chunks.iter().filter(|c| c.contains("<table>")).collect();
    assert_eq!(carrier.len(), 1);
    assert!(carrier[0].contains("</table>"));
    assert!(carrier[0].contains(&table));
}

#[test]
fn test_chunkText_withCaseVariantTableTags_shouldStillProtect() {
    let text = "<p>a</p><TABLE><tr><td>x</td></tr></TABLE><p>b</p>";
    let chunks = chunk_text(text, 10);

    assert_eq!(chunks.concat(), text);
    let carrier: Vec<&String> = chunks.iter().filter(|c| c.to_lowercase().contains("<table>")).collect();
    assert_eq!(carrier.len(), 1);
    assert!(carrier[0].to_lowercase().contains("</table>"));
}

#[test]
fn test_chunkText_withBlankLineBoundaries_shouldEndChunksThere() {
    let text = "First para.\n\nSecond para.\n\nThird para.";
    let chunks = chunk_text(text, 14);

    for (i, chunk) in chunks.iter().enumerate() {
        if i < chunks.len() - 1 {
            assert!(
                chunk.ends_with("\n\n") || chunk.ends_with('>'),
                "chunk {i} ends mid-paragraph: {:?}",
                chunk
            );
        }
    }
}
