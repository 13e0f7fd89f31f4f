//! Post-decode record validation.
//!
//! Everything here is advisory. A record that decodes cleanly can still
//! look biologically or structurally suspicious — a reference id pointing
//! outside the dictionary, a CIGAR that does not account for the read's
//! bases, an implausible coordinate. These produce human-readable
//! warnings, never errors, so pipelines can log them and move on.

use super::record::Record;

/// Positions beyond this are longer than any known chromosome.
const MAX_PLAUSIBLE_POSITION: i32 = 300_000_000;

/// Template lengths beyond this on a paired read suggest a structural
/// variant (or a mapping artifact).
const TEMPLATE_LENGTH_SV: i32 = 10_000;

/// Mapping qualities above this are outside the range common aligners
/// emit.
const MAX_COMMON_MAPQ: u8 = 60;

fn check_reference_id(id: i32, what: &str, reference_count: usize, warnings: &mut Vec<String>) {
    // -1 is the unmapped sentinel, not a dictionary miss.
    if id != -1 && (id < 0 || id as usize >= reference_count) {
        warnings.push(format!(
            "{what} reference id {id} outside dictionary of {reference_count} references"
        ));
    }
}

/// Check one decoded record against the reference dictionary size and
/// plausibility limits.
///
/// Returns a list of warnings, empty when nothing stands out. Never
/// fails — findings here are advisory, not decode errors.
///
/// # Example
///
/// ```
/// use bamstream::bam::{parse_record, validate};
/// # fn record() -> bamstream::bam::Record {
/// #     let mut data = Vec::new();
/// #     data.extend_from_slice(&0i32.to_le_bytes());
/// #     data.extend_from_slice(&100i32.to_le_bytes());
/// #     data.push(2);
/// #     data.push(99);
/// #     data.extend_from_slice(&0u16.to_le_bytes());
/// #     data.extend_from_slice(&0u16.to_le_bytes());
/// #     data.extend_from_slice(&0u16.to_le_bytes());
/// #     data.extend_from_slice(&0i32.to_le_bytes());
/// #     data.extend_from_slice(&(-1i32).to_le_bytes());
/// #     data.extend_from_slice(&(-1i32).to_le_bytes());
/// #     data.extend_from_slice(&0i32.to_le_bytes());
/// #     data.extend_from_slice(b"r\0");
/// #     parse_record(&data).unwrap()
/// # }
/// let warnings = validate(&record(), 1);
/// assert!(warnings.iter().any(|w| w.contains("mapping quality")));
/// ```
pub fn validate(record: &Record, reference_count: usize) -> Vec<String> {
    let mut warnings = Vec::new();

    check_reference_id(record.reference_id, "read", reference_count, &mut warnings);
    check_reference_id(
        record.mate_reference_id,
        "mate",
        reference_count,
        &mut warnings,
    );

    // A CIGAR must account for every base of the sequence it aligns.
    if !record.cigar.is_empty() && record.sequence != "*" {
        let query_len: u64 = record
            .cigar
            .iter()
            .filter(|op| op.consumes_query())
            .map(|op| op.length() as u64)
            .sum();
        if query_len != record.sequence_length as u64 {
            warnings.push(format!(
                "CIGAR consumes {query_len} query bases but sequence length is {}",
                record.sequence_length
            ));
        }
    }

    if record.mapq > MAX_COMMON_MAPQ {
        warnings.push(format!(
            "unusually high mapping quality {} (common aligners stay at or below {MAX_COMMON_MAPQ})",
            record.mapq
        ));
    }

    if record.is_paired() && record.template_length.saturating_abs() > TEMPLATE_LENGTH_SV {
        warnings.push(format!(
            "template length {} on a paired read; possible structural variant",
            record.template_length
        ));
    }

    if record.position > MAX_PLAUSIBLE_POSITION {
        warnings.push(format!(
            "position {} is beyond any plausible chromosome length",
            record.position
        ));
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bam::cigar::CigarOp;
    use crate::bam::tags::Tags;

    fn base_record() -> Record {
        Record {
            name: "r1".to_string(),
            reference_id: 0,
            position: 100,
            read_name_len: 3,
            mapq: 40,
            bin: 0,
            cigar_op_count: 0,
            flags: 0,
            sequence_length: 0,
            mate_reference_id: -1,
            mate_position: -1,
            template_length: 0,
            cigar: Vec::new(),
            sequence: String::from("*"),
            quality: String::from("*"),
            tags: Tags::new(),
            bytes_consumed: 35,
        }
    }

    #[test]
    fn clean_record_has_no_warnings() {
        assert!(validate(&base_record(), 2).is_empty());
    }

    #[test]
    fn unmapped_sentinel_is_accepted() {
        let mut record = base_record();
        record.reference_id = -1;
        record.mate_reference_id = -1;
        assert!(validate(&record, 2).is_empty());
    }

    #[test]
    fn out_of_range_reference_ids() {
        let mut record = base_record();
        record.reference_id = 5;
        record.mate_reference_id = -3;
        let warnings = validate(&record, 2);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("read reference id 5"));
        assert!(warnings[1].contains("mate reference id -3"));
    }

    #[test]
    fn cigar_sequence_length_mismatch() {
        let mut record = base_record();
        record.cigar = vec![CigarOp::Match(3), CigarOp::Deletion(2)];
        record.sequence = String::from("ACGT");
        record.sequence_length = 4;
        let warnings = validate(&record, 2);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("CIGAR consumes 3"));
    }

    #[test]
    fn matching_cigar_is_quiet() {
        let mut record = base_record();
        // 2M1I1S consumes 4 query bases; 1D does not.
        record.cigar = vec![
            CigarOp::Match(2),
            CigarOp::Insertion(1),
            CigarOp::Deletion(1),
            CigarOp::SoftClip(1),
        ];
        record.sequence = String::from("ACGT");
        record.sequence_length = 4;
        assert!(validate(&record, 2).is_empty());
    }

    #[test]
    fn absent_sequence_skips_cigar_check() {
        let mut record = base_record();
        record.cigar = vec![CigarOp::Match(50)];
        assert!(validate(&record, 2).is_empty());
    }

    #[test]
    fn high_mapq_is_flagged() {
        let mut record = base_record();
        record.mapq = 61;
        let warnings = validate(&record, 2);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("mapping quality 61"));
    }

    #[test]
    fn large_template_length_only_when_paired() {
        let mut record = base_record();
        record.template_length = 50_000;
        assert!(validate(&record, 2).is_empty());

        record.flags = 0x1;
        let warnings = validate(&record, 2);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("50000"));

        record.template_length = -50_000;
        assert_eq!(validate(&record, 2).len(), 1);
    }

    #[test]
    fn implausible_position_is_flagged() {
        let mut record = base_record();
        record.position = 300_000_001;
        let warnings = validate(&record, 2);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("300000001"));
    }
}
