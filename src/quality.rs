//! JPEG quality estimation from quantization tables
//!
//! Encoders derived from the IJG library scale the Annex K reference tables
//! by a factor computed from the requested quality:
//!
//! - `q < 50`: `scale = 5000 / q`
//! - `q >= 50`: `scale = 200 - 2q`
//!
//! Comparing a stored table against its reference recovers the mean scale and
//! therefore the quality. Tables without a known reference are skipped.

use byteorder::{BigEndian, ReadBytesExt};
use std::io::Cursor;

/// Entries per quantization table
const TABLE_LEN: usize = 64;

/// Annex K.1 luminance table, in the order entries are stored in a DQT segment
pub const STANDARD_LUMINANCE: [u16; TABLE_LEN] = [
    16, 11, 12, 14, 12, 10, 16, 14,
    13, 14, 18, 17, 16, 19, 24, 40,
    26, 24, 22, 22, 24, 49, 35, 37,
    29, 40, 58, 51, 61, 60, 57, 51,
    56, 55, 64, 72, 92, 78, 64, 68,
    87, 69, 55, 56, 80, 109, 81, 87,
    95, 98, 103, 104, 103, 62, 77, 113,
    121, 112, 100, 120, 92, 101, 103, 99,
];

/// Annex K.1 chrominance table, in the order entries are stored in a DQT segment
pub const STANDARD_CHROMINANCE: [u16; TABLE_LEN] = [
    17, 18, 18, 24, 21, 24, 47, 26,
    26, 47, 99, 66, 56, 66, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
];

/// Reference table for a table identifier, if one is defined
fn reference_table(id: u8) -> Option<&'static [u16; TABLE_LEN]> {
    match id {
        0 => Some(&STANDARD_LUMINANCE),
        1 => Some(&STANDARD_CHROMINANCE),
        _ => None,
    }
}

/// Quality estimate for one quantization table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableEstimate {
    /// Table identifier (low nibble of the Pq/Tq byte)
    pub id: u8,
    /// Mean of `100 * entry / reference` over the table
    pub mean_scale: f64,
    /// Estimated encoder quality, 0–100
    pub quality: f64,
}

/// Invert the IJG scaling formula
pub fn quality_from_scale(mean_scale: f64, all_ones: bool) -> f64 {
    if all_ones {
        100.0
    } else if mean_scale <= 100.0 {
        (200.0 - mean_scale) / 2.0
    } else {
        5000.0 / mean_scale
    }
}

/// Estimate every table in a DQT payload that has a reference table
///
/// A truncated trailing table is ignored.
pub fn estimate_tables(payload: &[u8]) -> Vec<TableEstimate> {
    let mut cursor = Cursor::new(payload);
    let mut estimates = Vec::new();

    while (cursor.position() as usize) < payload.len() {
        let Ok(pq_tq) = cursor.read_u8() else { break };
        let wide = pq_tq >> 4 != 0;
        let id = pq_tq & 0x0F;
        let reference = reference_table(id);

        let mut sum = 0.0f64;
        let mut all_ones = true;
        for index in 0..TABLE_LEN {
            let entry = if wide {
                cursor.read_u16::<BigEndian>()
            } else {
                cursor.read_u8().map(u16::from)
            };
            let Ok(entry) = entry else {
                return estimates;
            };

            if let Some(reference) = reference {
                sum += 100.0 * entry as f64 / reference[index] as f64;
                all_ones &= entry == 1;
            }
        }

        if reference.is_some() {
            let mean_scale = sum / TABLE_LEN as f64;
            let quality = quality_from_scale(mean_scale, all_ones);
            log::trace!(
                "DQT table {}: mean scale {:.2}, quality {:.2}",
                id,
                mean_scale,
                quality
            );
            estimates.push(TableEstimate {
                id,
                mean_scale,
                quality,
            });
        }
    }

    estimates
}

/// Highest quality estimate among the tables of a DQT payload
pub fn estimate_quality(payload: &[u8]) -> Option<f64> {
    estimate_tables(payload)
        .into_iter()
        .map(|estimate| estimate.quality)
        .reduce(f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(id: u8, entries: &[u16]) -> Vec<u8> {
        let mut payload = vec![id];
        payload.extend(entries.iter().map(|&e| e as u8));
        payload
    }

    fn scaled(reference: &[u16; TABLE_LEN], quality: u32) -> Vec<u16> {
        let scale = if quality < 50 { 5000 / quality } else { 200 - quality * 2 };
        reference
            .iter()
            .map(|&r| ((r as u32 * scale + 50) / 100).clamp(1, 255) as u16)
            .collect()
    }

    #[test]
    fn test_all_ones_is_quality_100() {
        let estimates = estimate_tables(&table(0, &[1; TABLE_LEN]));
        assert_eq!(estimates.len(), 1);
        assert_eq!(estimates[0].quality, 100.0);
    }

    #[test]
    fn test_reference_table_sits_on_branch_boundary() {
        let estimates = estimate_tables(&table(0, &STANDARD_LUMINANCE));
        assert_eq!(estimates[0].mean_scale, 100.0);
        // Both branches of the inversion agree at the boundary.
        assert_eq!(estimates[0].quality, 50.0);
        assert_eq!(5000.0 / estimates[0].mean_scale, 50.0);
    }

    #[test]
    fn test_typical_encoder_qualities() {
        for quality in [25u32, 75, 90] {
            let estimate = estimate_quality(&table(0, &scaled(&STANDARD_LUMINANCE, quality)))
                .unwrap();
            assert!(
                (estimate - quality as f64).abs() < 2.0,
                "quality {} estimated as {}",
                quality,
                estimate
            );
        }
    }

    #[test]
    fn test_multiple_tables_take_maximum() {
        let mut payload = table(0, &scaled(&STANDARD_LUMINANCE, 60));
        payload.extend(table(1, &scaled(&STANDARD_CHROMINANCE, 90)));

        let estimates = estimate_tables(&payload);
        assert_eq!(estimates.len(), 2);
        assert_eq!(estimates[1].id, 1);

        let best = estimate_quality(&payload).unwrap();
        assert_eq!(best, estimates[1].quality);
        assert!(best > estimates[0].quality);
    }

    #[test]
    fn test_unknown_table_is_consumed_but_ignored() {
        let mut payload = table(2, &[1; TABLE_LEN]);
        payload.extend(table(0, &STANDARD_LUMINANCE));

        let estimates = estimate_tables(&payload);
        assert_eq!(estimates.len(), 1);
        assert_eq!(estimates[0].id, 0);
        assert_eq!(estimates[0].quality, 50.0);

        assert_eq!(estimate_quality(&table(3, &[1; TABLE_LEN])), None);
    }

    #[test]
    fn test_sixteen_bit_entries() {
        let mut payload = vec![0x10];
        for _ in 0..TABLE_LEN {
            payload.extend_from_slice(&1u16.to_be_bytes());
        }
        assert_eq!(estimate_quality(&payload), Some(100.0));
    }

    #[test]
    fn test_truncated_table_is_ignored() {
        let mut payload = table(0, &[1; TABLE_LEN]);
        payload.extend(table(1, &[1; 10]));
        assert_eq!(estimate_tables(&payload).len(), 1);
        assert_eq!(estimate_quality(&[]), None);
    }
}
