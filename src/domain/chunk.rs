//! ドメインサービス: チャンク計画
//!
//! ファイル全体のサイズとチャンクサイズから、送信するパートの順序付き列を計算する。
//! 副作用のない純粋関数で、通常アップロード（内部ループ）と
//! プログレッシブアップロード（呼び出し側が1パートずつ送る）の両方で使う。

use crate::domain::error::DomainError;
use std::ops::Range;

/// ファイルの連続したバイト範囲 `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Part {
    /// 0始まりの順序番号
    pub index: usize,
    pub start: u64,
    pub end: u64,
    /// 範囲の終端がファイルサイズと一致する唯一のパートのみ true
    pub is_last: bool,
}

impl Part {
    pub fn new(index: usize, start: u64, end: u64, is_last: bool) -> Self {
        Self {
            index,
            start,
            end,
            is_last,
        }
    }

    /// パートのバイト数
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<u64> {
        self.start..self.end
    }

    /// リモートAPI向けの1始まりのパート番号
    pub fn number(&self) -> usize {
        self.index + 1
    }
}

/// パート列を計算する
///
/// # Arguments
/// * `total_size` - ファイル全体のバイト数
/// * `chunk_size` - 1パートの最大バイト数
///
/// # Returns
/// 連続・非重複で `[0, total_size)` を覆うパート列。
/// `total_size == 0` の場合は空範囲のパートを1つだけ返す（空ファイルもセッションを完了できる）。
///
/// # Errors
/// `chunk_size == 0` の場合 `DomainError::InvalidChunkSize`
pub fn plan(total_size: u64, chunk_size: u64) -> Result<Vec<Part>, DomainError> {
    if chunk_size == 0 {
        return Err(DomainError::InvalidChunkSize { size: chunk_size });
    }

    if total_size == 0 {
        return Ok(vec![Part::new(0, 0, 0, true)]);
    }

    let count = total_size.div_ceil(chunk_size);
    let parts = (0..count)
        .map(|i| {
            let start = i * chunk_size;
            let end = (start + chunk_size).min(total_size);
            Part::new(i as usize, start, end, end == total_size)
        })
        .collect();

    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_well_formed(parts: &[Part], total_size: u64) {
        assert!(!parts.is_empty());
        assert_eq!(parts[0].start, 0);
        for (i, pair) in parts.windows(2).enumerate() {
            assert_eq!(pair[0].end, pair[1].start, "gap or overlap after part {}", i);
        }
        assert_eq!(parts.last().unwrap().end, total_size);
        assert_eq!(parts.iter().filter(|p| p.is_last).count(), 1);
        assert!(parts.last().unwrap().is_last);
        for (i, part) in parts.iter().enumerate() {
            assert_eq!(part.index, i);
        }
    }

    #[test]
    fn test_two_equal_parts() {
        let parts = plan(10_000_000, 5_000_000).unwrap();
        assert_eq!(
            parts,
            vec![
                Part::new(0, 0, 5_000_000, false),
                Part::new(1, 5_000_000, 10_000_000, true),
            ]
        );
    }

    #[test]
    fn test_trailing_short_part() {
        let parts = plan(11, 4).unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2], Part::new(2, 8, 11, true));
        assert_well_formed(&parts, 11);
    }

    #[test]
    fn test_file_smaller_than_chunk() {
        let parts = plan(3, 4).unwrap();
        assert_eq!(parts, vec![Part::new(0, 0, 3, true)]);
    }

    #[test]
    fn test_zero_byte_file_has_single_last_part() {
        let parts = plan(0, 4).unwrap();
        assert_eq!(parts, vec![Part::new(0, 0, 0, true)]);
        assert!(parts[0].is_empty());
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        assert_eq!(
            plan(10, 0).unwrap_err(),
            DomainError::InvalidChunkSize { size: 0 }
        );
    }

    #[test]
    fn test_plans_are_well_formed_across_sizes() {
        for total in [1u64, 2, 7, 8, 9, 63, 64, 65, 1000] {
            for chunk in [1u64, 2, 3, 8, 64, 1000, 5000] {
                let parts = plan(total, chunk).unwrap();
                assert_well_formed(&parts, total);
                assert!(parts.iter().all(|p| p.len() <= chunk && !p.is_empty()));
            }
        }
    }

    #[test]
    fn test_part_number_is_one_based() {
        assert_eq!(Part::new(0, 0, 1, true).number(), 1);
        assert_eq!(Part::new(4, 0, 1, true).number(), 5);
    }
}
