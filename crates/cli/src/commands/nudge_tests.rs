// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    immediate = { ModeArg::Immediate, NudgeMode::Immediate },
    queue = { ModeArg::Queue, NudgeMode::Queue },
    wait_idle = { ModeArg::WaitIdle, NudgeMode::WaitIdle },
)]
fn mode_args_map(arg: ModeArg, expected: NudgeMode) {
    assert_eq!(NudgeMode::from(arg), expected);
}

#[test]
fn priority_args_map() {
    assert_eq!(NudgePriority::from(PriorityArg::Normal), NudgePriority::Normal);
    assert_eq!(NudgePriority::from(PriorityArg::Urgent), NudgePriority::Urgent);
}
