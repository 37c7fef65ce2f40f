//! 换片策略：决定何时关闭当前分片并打开下一个。
//!
//! 判断发生在写入下一行*之前*，所以任何一行都不会被拆开写入两个分片。

use crate::job::SplitPolicy;
use crate::split::SplitState;

pub trait RolloverPolicy: Send {
    /// 写入长度为 `next_line_len` 的下一行之前调用
    fn should_rollover(&self, state: &SplitState, next_line_len: u64) -> bool;

    fn on_part_opened(&mut self, state: &mut SplitState) {
        state.lines_in_current_part = 0;
        state.bytes_in_current_part = 0;
    }

    fn on_line_written(&mut self, state: &mut SplitState, line_len: u64) {
        state.lines_in_current_part += 1;
        state.bytes_in_current_part += line_len;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ByLineCount {
    pub lines_per_part: u64,
}

impl RolloverPolicy for ByLineCount {
    fn should_rollover(&self, state: &SplitState, _next_line_len: u64) -> bool {
        state.lines_in_current_part >= self.lines_per_part
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ByByteSize {
    pub max_bytes: u64,
}

impl RolloverPolicy for ByByteSize {
    // 空分片总是接收第一行，哪怕这一行本身超过上限
    fn should_rollover(&self, state: &SplitState, next_line_len: u64) -> bool {
        state.lines_in_current_part == 0
            || state.bytes_in_current_part + next_line_len > self.max_bytes
    }
}

impl SplitPolicy {
    pub fn rollover(&self) -> Box<dyn RolloverPolicy> {
        match *self {
            SplitPolicy::ByLineCount(n) => Box::new(ByLineCount { lines_per_part: n }),
            SplitPolicy::ByByteSize(max) => Box::new(ByByteSize { max_bytes: max }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(policy: &mut dyn RolloverPolicy, lens: &[u64]) -> SplitState {
        let mut state = SplitState::default();
        policy.on_part_opened(&mut state);
        for len in lens {
            policy.on_line_written(&mut state, *len);
        }
        state
    }

    #[test]
    fn line_count_rolls_after_exactly_n_lines() {
        let mut policy = ByLineCount { lines_per_part: 3 };
        let two = written(&mut policy, &[1, 1]);
        assert!(!policy.should_rollover(&two, 1));
        let three = written(&mut policy, &[1, 1, 1]);
        assert!(policy.should_rollover(&three, 1));
    }

    #[test]
    fn byte_size_rolls_before_overflowing_line() {
        let mut policy = ByByteSize { max_bytes: 500 };
        let state = written(&mut policy, &[120, 120, 120, 120]);
        assert_eq!(state.bytes_in_current_part, 480);
        assert!(policy.should_rollover(&state, 120));
        assert!(!policy.should_rollover(&state, 20));
    }

    #[test]
    fn byte_size_always_wants_a_fresh_part_when_empty() {
        let mut policy = ByByteSize { max_bytes: 10 };
        let state = written(&mut policy, &[]);
        assert!(policy.should_rollover(&state, 1_000));
    }

    #[test]
    fn part_open_resets_counters() {
        let mut policy = SplitPolicy::ByLineCount(2).rollover();
        let mut state = written(policy.as_mut(), &[7, 8]);
        policy.on_part_opened(&mut state);
        assert_eq!(state.lines_in_current_part, 0);
        assert_eq!(state.bytes_in_current_part, 0);
    }
}
