use frankenspawn_core::errno::{EBADF, EINVAL};
use frankenspawn_core::process::{CHILD_FAILURE_STATUS, ExitOutcome};
use frankenspawn_core::spawn::flags::{POSIX_SPAWN_FLAGS_MASK, sanitize_spawn_flags};
use frankenspawn_core::spawn::{
    FileActionKind, FileActionList, ForkStrategy, SpawnAttributes, SpawnError, SpawnFlags,
};

#[derive(Clone, Copy, Debug)]
enum Op {
    Open(i32),
    Close(i32),
    Dup2(i32, i32),
    Chdir,
    Fchdir(i32),
}

#[derive(Clone, Copy)]
struct Case {
    op: Op,
    expected_errno: i32,
}

fn apply(list: &mut FileActionList, op: Op) -> Result<(), SpawnError> {
    match op {
        Op::Open(fd) => list.add_open(fd, c"/dev/null", 0, 0o644),
        Op::Close(fd) => list.add_close(fd),
        Op::Dup2(fd, new_fd) => list.add_dup2(fd, new_fd),
        Op::Chdir => list.add_chdir(c"/tmp"),
        Op::Fchdir(fd) => list.add_fchdir(fd),
    }
}

fn matrix_cases() -> Vec<Case> {
    let mut cases = Vec::new();
    for fd in [-1, i32::MIN] {
        cases.push(Case {
            op: Op::Open(fd),
            expected_errno: EBADF,
        });
        cases.push(Case {
            op: Op::Close(fd),
            expected_errno: EBADF,
        });
        cases.push(Case {
            op: Op::Dup2(fd, 1),
            expected_errno: EBADF,
        });
        cases.push(Case {
            op: Op::Dup2(1, fd),
            expected_errno: EBADF,
        });
        cases.push(Case {
            op: Op::Fchdir(fd),
            expected_errno: EBADF,
        });
    }
    for fd in [0, 1, 2, 1023, i32::MAX] {
        cases.push(Case {
            op: Op::Open(fd),
            expected_errno: 0,
        });
        cases.push(Case {
            op: Op::Close(fd),
            expected_errno: 0,
        });
        cases.push(Case {
            op: Op::Dup2(fd, fd),
            expected_errno: 0,
        });
        cases.push(Case {
            op: Op::Fchdir(fd),
            expected_errno: 0,
        });
    }
    cases.push(Case {
        op: Op::Chdir,
        expected_errno: 0,
    });
    cases
}

#[test]
fn file_action_builder_matrix() {
    for case in matrix_cases() {
        let mut list = FileActionList::new();
        let got = apply(&mut list, case.op).err().map_or(0, SpawnError::errno);
        assert_eq!(got, case.expected_errno, "{:?}", case.op);
        // Rejected calls leave the list untouched.
        assert_eq!(list.len(), usize::from(case.expected_errno == 0), "{:?}", case.op);
    }
}

#[test]
fn accepted_actions_keep_call_order() {
    let mut list = FileActionList::new();
    for case in matrix_cases().into_iter().filter(|c| c.expected_errno == 0) {
        apply(&mut list, case.op).unwrap();
    }
    let kinds: Vec<_> = list.iter().map(|a| a.kind()).collect();
    assert_eq!(kinds.len(), 21);
    assert_eq!(kinds[0], FileActionKind::Open);
    assert_eq!(kinds[1], FileActionKind::Close);
    assert_eq!(kinds[2], FileActionKind::Dup2);
    assert_eq!(kinds[3], FileActionKind::Fchdir);
    assert_eq!(kinds[20], FileActionKind::Chdir);
}

#[test]
fn flag_word_matrix() {
    for bits in i16::MIN..=i16::MAX {
        let mut attrs = SpawnAttributes::new();
        let known = bits & !POSIX_SPAWN_FLAGS_MASK == 0;
        match attrs.set_flags(bits) {
            Ok(()) => {
                assert!(known, "accepted unknown bits {bits:#x}");
                assert_eq!(attrs.flags().bits(), bits);
            }
            Err(err) => {
                assert!(!known, "rejected known bits {bits:#x}");
                assert_eq!(err.errno(), EINVAL);
                assert_eq!(attrs.flags(), SpawnFlags::EMPTY);
            }
        }
        let sanitized = sanitize_spawn_flags(bits);
        assert!(SpawnFlags::from_bits(sanitized).is_ok());
    }
}

#[test]
fn strategy_matrix() {
    for bits in 0..=POSIX_SPAWN_FLAGS_MASK {
        let flags = SpawnFlags::from_bits(bits).unwrap();
        for has_actions in [false, true] {
            let expected = if flags.contains(SpawnFlags::USEVFORK) || (bits == 0 && !has_actions)
            {
                ForkStrategy::Vfork
            } else {
                ForkStrategy::Fork
            };
            assert_eq!(
                ForkStrategy::select(flags, has_actions),
                expected,
                "flags={bits:#x} actions={has_actions}"
            );
        }
    }
}

#[test]
fn failure_sentinel_decodes_from_wait_status() {
    let outcome = ExitOutcome::from_wait_status(CHILD_FAILURE_STATUS << 8);
    assert!(outcome.is_spawn_failure());
    assert_eq!(outcome.exit_code(), Some(127));
    assert!(!ExitOutcome::from_wait_status(0).is_spawn_failure());
}
