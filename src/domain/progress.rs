/// ドメイン層: 進捗の集約
///
/// トランスポートが報告するパート単位の送信バイト数を、
/// ファイル全体に対する単調非減少のパーセント (0〜100) に変換します。
///
/// # 計算方法
/// 送信済みバイト = 完了済みパートのサイズ合計 + 送信中パートの送信済みバイト数。
/// 再送などでトランスポートが一時的に小さい値を報告しても、
/// 前回報告した最大値を下回る値は返さない。
use std::collections::BTreeMap;

/// 進捗の集約器
#[derive(Debug, Clone)]
pub struct ProgressAggregator {
    /// 進捗計算の分母となる総バイト数
    total_size: u64,
    /// 完了済みパート (index -> バイト数)
    completed: BTreeMap<usize, u64>,
    /// 送信中パート (index, パートのバイト数, 送信済みバイト数)
    in_flight: Option<(usize, u64, u64)>,
    /// 最後に報告したパーセント
    last_percent: u8,
}

impl ProgressAggregator {
    /// 新しい集約器を作成
    ///
    /// # Arguments
    /// * `total_size` - 進捗の分母となるバイト数
    pub fn new(total_size: u64) -> Self {
        Self {
            total_size,
            completed: BTreeMap::new(),
            in_flight: None,
            last_percent: 0,
        }
    }

    /// パートの送信開始を記録する
    pub fn begin_part(&mut self, index: usize, part_size: u64) {
        self.in_flight = Some((index, part_size, 0));
    }

    /// 送信中パートの送信済みバイト数を更新する
    ///
    /// # Returns
    /// パーセントが前回報告値から増えた場合のみ `Some(percent)`
    pub fn update(&mut self, part_index: usize, bytes_sent_for_part: u64) -> Option<u8> {
        match self.in_flight.as_mut() {
            Some((index, size, sent)) if *index == part_index => {
                *sent = bytes_sent_for_part.min(*size);
            }
            // 送信中でないパートの報告は無視する
            _ => return None,
        }
        self.recompute()
    }

    /// パートの完了を記録する
    ///
    /// # Returns
    /// パーセントが増えた場合のみ `Some(percent)`
    pub fn complete_part(&mut self, index: usize, part_size: u64) -> Option<u8> {
        if matches!(self.in_flight, Some((i, _, _)) if i == index) {
            self.in_flight = None;
        }
        self.completed.insert(index, part_size);
        self.recompute()
    }

    /// 最後に報告したパーセント
    pub fn percent(&self) -> u8 {
        self.last_percent
    }

    /// 送信済みとみなすバイト数
    pub fn bytes_sent(&self) -> u64 {
        let completed: u64 = self.completed.values().sum();
        let in_flight = self.in_flight.map(|(_, _, sent)| sent).unwrap_or(0);
        completed + in_flight
    }

    fn recompute(&mut self) -> Option<u8> {
        let percent = if self.total_size == 0 {
            // 空ファイルは完了した時点で100%
            if self.completed.is_empty() { 0 } else { 100 }
        } else {
            let ratio = u128::from(self.bytes_sent()) * 100 / u128::from(self.total_size);
            ratio.min(100) as u8
        };

        if percent > self.last_percent {
            self.last_percent = percent;
            Some(percent)
        } else {
            None
        }
    }
}
