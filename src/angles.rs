//! Parser for the generator's structured text output.
//!
//! The text model is instructed to emit a general product analysis followed
//! by ten angle blocks. Nothing guarantees it complies, so the parser is
//! infallible by design: it never rejects input, it only recovers as much
//! structure as the text actually contains. Parsing runs in two independent
//! passes, section split first, then angle split, so each pass can be tested
//! on its own.

/// Section marker separating the general analysis from the angle list.
pub const ANGLE_SECTION_MARKER: &str = "=== 10 ANGLE OUTPUT ===";

/// Delimiter opening each angle block inside the angle section. Deliberately
/// not the full header line: the index and trailing dashes the model emits
/// stay attached to the following segment.
pub const ANGLE_DELIMITER: &str = "--- ANGLE";

/// Segments at or below this trimmed length are split debris rather than
/// real angle blocks.
const MIN_ANGLE_SEGMENT_LEN: usize = 10;

/// One parsed angle block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AngleResult {
    /// Display title, `Angle <n>` with a 1-based positional index.
    pub title: String,
    /// Normalized `--- ANGLE <n>` header followed by the raw segment text.
    pub content: String,
}

/// Full result of one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    /// Unmodified model output, kept for display and debugging.
    pub raw: String,
    /// Everything before the angle section marker, or the whole output when
    /// the marker is missing.
    pub general_analysis: String,
    /// Angle blocks in order of appearance. Empty when the marker is missing
    /// or no segment survives the length filter.
    pub angles: Vec<AngleResult>,
}

/// First pass: split raw output into the general analysis and the angle
/// section at the first occurrence of [`ANGLE_SECTION_MARKER`].
///
/// Returns `(before, after)`. When the marker is absent, `before` is the
/// whole input and `after` is empty.
pub fn split_sections(raw: &str) -> (&str, &str) {
    match raw.split_once(ANGLE_SECTION_MARKER) {
        Some((before, after)) => (before, after),
        None => (raw, ""),
    }
}

/// Second pass: split the angle section on [`ANGLE_DELIMITER`] and keep the
/// segments long enough to be real blocks.
///
/// The piece before the first delimiter goes through the same filter, which
/// is what drops the whitespace fragment the split produces there.
pub fn split_angle_segments(section: &str) -> Vec<&str> {
    section
        .split(ANGLE_DELIMITER)
        .filter(|segment| segment.trim().len() > MIN_ANGLE_SEGMENT_LEN)
        .collect()
}

/// Parse raw model output into an [`AnalysisResult`].
///
/// Malformed output is not an error: without the section marker the whole
/// text becomes `general_analysis` and `angles` stays empty. Retained
/// segments are numbered 1-based in order of appearance, ignoring whatever
/// numeral the model wrote inside the segment itself, and each gets a
/// normalized `--- ANGLE <n>` header re-prepended for display.
pub fn parse(raw: &str) -> AnalysisResult {
    let (general_analysis, angle_section) = split_sections(raw);

    let angles = split_angle_segments(angle_section)
        .into_iter()
        .enumerate()
        .map(|(i, segment)| AngleResult {
            title: format!("Angle {}", i + 1),
            content: format!("--- ANGLE {}{}", i + 1, segment),
        })
        .collect();

    AnalysisResult {
        raw: raw.to_string(),
        general_analysis: general_analysis.to_string(),
        angles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_output() -> String {
        format!(
            "NAMA PRODUK:\nBlender Portable 500ml\n\nKATEGORI:\nPeralatan Dapur\n\n\
             SELLING POINT PALING KUAT:\nBisa dibawa ke mana saja\n\n\
             {ANGLE_SECTION_MARKER}\n\n\
             --- ANGLE 1 ---\n🎭 Tipe Angle: Shock Value\n\n\
             🎥 Prompt Veo 3:\nClose-up of the blender crushing ice in slow motion\n\n\
             --- ANGLE 2 ---\n🎭 Tipe Angle: Masalah - Solusi\n\n\
             🎥 Prompt Veo 3:\nA commuter struggling with a bulky blender at home\n\n\
             --- ANGLE 3 ---\n🎭 Tipe Angle: POV\n\n\
             🎥 Prompt Veo 3:\nPOV shot unboxing the blender on a wooden desk\n"
        )
    }

    #[test]
    fn test_parse_separates_analysis_from_angles() {
        let result = parse(&sample_output());

        assert!(result.general_analysis.contains("NAMA PRODUK:"));
        assert!(result.general_analysis.contains("Blender Portable 500ml"));
        assert!(!result.general_analysis.contains("Tipe Angle"));
        assert_eq!(result.angles.len(), 3);
    }

    #[test]
    fn test_parse_keeps_raw_output_verbatim() {
        let raw = sample_output();
        let result = parse(&raw);
        assert_eq!(result.raw, raw);
    }

    #[test]
    fn test_parse_titles_and_headers_are_positional() {
        let result = parse(&sample_output());

        for (i, angle) in result.angles.iter().enumerate() {
            assert_eq!(angle.title, format!("Angle {}", i + 1));
            assert!(angle.content.starts_with(&format!("--- ANGLE {}", i + 1)));
        }
    }

    #[test]
    fn test_parse_index_ignores_model_numbering() {
        // The model skipped numbers; positions still count 1, 2.
        let raw = format!(
            "analysis\n{ANGLE_SECTION_MARKER}\n\
             --- ANGLE 7 ---\nfirst block with enough text\n\
             --- ANGLE 9 ---\nsecond block with enough text\n"
        );
        let result = parse(&raw);

        assert_eq!(result.angles.len(), 2);
        assert_eq!(result.angles[0].title, "Angle 1");
        assert_eq!(result.angles[1].title, "Angle 2");
        // The model's own numeral stays in the body after the normalized header.
        assert!(result.angles[0].content.starts_with("--- ANGLE 1 7 ---"));
        assert!(result.angles[1].content.starts_with("--- ANGLE 2 9 ---"));
    }

    #[test]
    fn test_parse_missing_marker_swallows_whole_text() {
        let raw = "The model ignored the format and wrote an essay instead.";
        let result = parse(raw);

        assert_eq!(result.general_analysis, raw);
        assert_eq!(result.raw, raw);
        assert!(result.angles.is_empty());
    }

    #[test]
    fn test_parse_empty_input() {
        let result = parse("");
        assert_eq!(result.general_analysis, "");
        assert!(result.angles.is_empty());
    }

    #[test]
    fn test_parse_drops_short_segments() {
        let raw = format!(
            "analysis\n{ANGLE_SECTION_MARKER}\n\
             --- ANGLE 1 ---\n\
             --- ANGLE 2 ---\nthis one is long enough to keep\n"
        );
        let result = parse(&raw);

        // " 1 ---\n" trims to 5 chars and is dropped.
        assert_eq!(result.angles.len(), 1);
        assert!(result.angles[0].content.contains("long enough to keep"));
    }

    #[test]
    fn test_parse_keeps_long_leading_fragment() {
        // Only short fragments are filtered. A long preamble between the
        // marker and the first delimiter counts as a segment like any other.
        let raw = format!(
            "analysis\n{ANGLE_SECTION_MARKER}\n\
             Untuk setiap ANGLE gunakan format ini:\n\
             --- ANGLE 1 ---\nreal first block with enough text\n"
        );
        let result = parse(&raw);

        assert_eq!(result.angles.len(), 2);
        assert!(result.angles[0].content.contains("gunakan format ini"));
        assert!(result.angles[1].content.contains("real first block"));
    }

    #[test]
    fn test_split_sections_uses_first_marker() {
        let raw = format!("before\n{ANGLE_SECTION_MARKER}\nmiddle\n{ANGLE_SECTION_MARKER}\nafter");
        let (before, after) = split_sections(&raw);

        assert_eq!(before, "before\n");
        assert!(after.contains(ANGLE_SECTION_MARKER));
        assert!(after.ends_with("after"));
    }

    #[test]
    fn test_split_angle_segments_on_empty_section() {
        assert!(split_angle_segments("").is_empty());
        assert!(split_angle_segments("\n\n   \n").is_empty());
    }

    #[test]
    fn test_angle_bodies_hold_no_unconsumed_delimiter() {
        let result = parse(&sample_output());
        assert!(!result.angles.is_empty());

        for (i, angle) in result.angles.iter().enumerate() {
            let header = format!("--- ANGLE {}", i + 1);
            let body = angle
                .content
                .strip_prefix(&header)
                .unwrap_or(&angle.content);
            assert!(
                !body.contains(ANGLE_DELIMITER),
                "angle body still holds a delimiter: {body:?}"
            );
        }
    }
}
