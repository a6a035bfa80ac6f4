/*!
 * Synchronization Primitive Tests
 * zap, block_me and unblock_proc through the running kernel
 */

mod common;

use common::{kernel, Recorder, STACK};
use pretty_assertions::assert_eq;
use sim_kernel::{HaltReason, Kernel, ProcessStatus, Resumed, UnblockError};

#[test]
fn test_zap_waits_for_target_to_quit() {
    let kernel = kernel();
    let log = Recorder::new();
    let rec = log.clone();

    let report = kernel.startup(move |k: Kernel, _arg: String| async move {
        let target_log = rec.clone();
        let target = k
            .fork(
                "target",
                move |k: Kernel, _arg: String| async move {
                    target_log.push(format!("target zapped {}", k.is_zapped()));
                    3
                },
                "",
                STACK,
                3,
            )
            .await
            .unwrap();

        let zapper_log = rec.clone();
        k.fork(
            "zapper",
            move |k: Kernel, _arg: String| async move {
                let resumed = k.zap(target).await;
                zapper_log.push(format!("zapper resumed {}", resumed.code()));
                0
            },
            "",
            STACK,
            2,
        )
        .await
        .unwrap();

        for _ in 0..2 {
            let joined = k.join().await.unwrap();
            rec.push(format!("joined {} {}", joined.pid, joined.status));
        }
        0
    });

    assert!(report.is_clean());
    assert_eq!(
        log.events(),
        vec![
            "target zapped true",
            "joined 3 3",
            "zapper resumed 0",
            "joined 4 0",
        ]
    );
}

#[test]
fn test_every_zapper_is_woken() {
    let kernel = kernel();
    let log = Recorder::new();
    let rec = log.clone();

    let report = kernel.startup(move |k: Kernel, _arg: String| async move {
        let target = k
            .fork(
                "target",
                |k: Kernel, _arg: String| async move {
                    k.execute(10_000).await;
                    0
                },
                "",
                STACK,
                4,
            )
            .await
            .unwrap();

        for name in ["z1", "z2"] {
            let zapper_log = rec.clone();
            k.fork(
                name,
                move |k: Kernel, _arg: String| async move {
                    let resumed = k.zap(target).await;
                    zapper_log.push(format!("{} {:?}", name, resumed));
                    0
                },
                "",
                STACK,
                3,
            )
            .await
            .unwrap();
        }

        for _ in 0..3 {
            k.join().await.unwrap();
        }
        0
    });

    assert!(report.is_clean());
    assert_eq!(log.events(), vec!["z1 Normal", "z2 Normal"]);
}

#[test]
fn test_zap_of_quit_child_returns_at_once() {
    let kernel = kernel();
    let log = Recorder::new();
    let rec = log.clone();

    kernel.startup(move |k: Kernel, _arg: String| async move {
        let parent_log = rec.clone();
        k.fork(
            "parent",
            move |k: Kernel, _arg: String| async move {
                // The child outranks its parent and quits inside fork
                let child = k
                    .fork("child", |_k: Kernel, _arg: String| async { 5 }, "", STACK, 2)
                    .await
                    .unwrap();
                let info = k.process(child).unwrap();
                parent_log.push(format!("{} {:?}", info.status, info.quit_status));

                let resumed = k.zap(child).await;
                parent_log.push(format!("zap {:?}", resumed));

                let joined = k.join().await.unwrap();
                parent_log.push(format!("joined {}", joined.status));
                0
            },
            "",
            STACK,
            4,
        )
        .await
        .unwrap();
        k.join().await.unwrap();
        0
    });

    assert_eq!(
        log.events(),
        vec!["QUIT Some(5)", "zap Normal", "joined 5"]
    );
}

#[test]
fn test_self_zap_halts() {
    let kernel = kernel();
    let report = kernel.startup(|k: Kernel, _arg: String| async move {
        k.zap(k.getpid()).await;
        0
    });

    assert_eq!(report.code, 1);
    assert_eq!(report.reason, HaltReason::SelfZap(2));
    assert!(kernel.transcript().iter().any(|line| line.starts_with("FATAL")));
}

#[test]
fn test_zap_of_missing_pid_halts() {
    let kernel = kernel();
    let report = kernel.startup(|k: Kernel, _arg: String| async move {
        k.zap(42).await;
        0
    });

    assert_eq!(report.code, 1);
    assert_eq!(report.reason, HaltReason::ZapTargetMissing(42));
}

#[test]
fn test_reserved_block_status_halts() {
    let kernel = kernel();
    let report = kernel.startup(|k: Kernel, _arg: String| async move {
        k.block_me(10).await;
        0
    });

    assert_eq!(report.code, 1);
    assert_eq!(report.reason, HaltReason::ReservedBlockStatus(10));
}

#[test]
fn test_block_then_unblock() {
    let kernel = kernel();
    let log = Recorder::new();
    let rec = log.clone();

    let report = kernel.startup(move |k: Kernel, _arg: String| async move {
        let sleeper_log = rec.clone();
        let sleeper = k
            .fork(
                "sleeper",
                move |k: Kernel, _arg: String| async move {
                    let resumed = k.block_me(20).await;
                    sleeper_log.push(format!("sleeper {}", resumed.code()));
                    0
                },
                "",
                STACK,
                2,
            )
            .await
            .unwrap();

        let waker_log = rec.clone();
        k.fork(
            "waker",
            move |k: Kernel, _arg: String| async move {
                let status = k.process(sleeper).map(|p| p.status);
                waker_log.push(format!("{:?}", status));
                let woke = k.unblock_proc(sleeper).await;
                waker_log.push(format!("waker {:?}", woke));
                0
            },
            "",
            STACK,
            3,
        )
        .await
        .unwrap();

        k.join().await.unwrap();
        k.join().await.unwrap();
        0
    });

    assert!(report.is_clean());
    assert_eq!(
        log.events(),
        vec![
            format!("{:?}", Some(ProcessStatus::Blocked(20))),
            "sleeper 0".to_string(),
            "waker Ok(Normal)".to_string(),
        ]
    );
}

#[test]
fn test_unblock_rejections() {
    let kernel = kernel();
    let log = Recorder::new();
    let rec = log.clone();

    kernel.startup(move |k: Kernel, _arg: String| async move {
        let child = k
            .fork("ready", |_k: Kernel, _arg: String| async { 0 }, "", STACK, 3)
            .await
            .unwrap();

        for pid in [k.getpid(), 99, child] {
            let err = k.unblock_proc(pid).await.unwrap_err();
            rec.push(format!("{:?} {}", err, err.legacy_code()));
        }
        k.join().await.unwrap();
        0
    });

    assert_eq!(
        log.events(),
        vec![
            format!("{:?} -2", UnblockError::SelfUnblock(2)),
            format!("{:?} -2", UnblockError::NoSuchProcess(99)),
            format!("{:?} -2", UnblockError::NotBlocked { pid: 3, status: 1 }),
        ]
    );
}

#[test]
fn test_zapped_sleeper_wakes_zapped() {
    let kernel = kernel();
    let log = Recorder::new();
    let rec = log.clone();

    let report = kernel.startup(move |k: Kernel, _arg: String| async move {
        let sleeper_log = rec.clone();
        let sleeper = k
            .fork(
                "sleeper",
                move |k: Kernel, _arg: String| async move {
                    let resumed = k.block_me(20).await;
                    sleeper_log.push(format!("sleeper {}", resumed.code()));
                    0
                },
                "",
                STACK,
                3,
            )
            .await
            .unwrap();

        let waker_log = rec.clone();
        k.fork(
            "waker",
            move |k: Kernel, _arg: String| async move {
                let woke = k.unblock_proc(sleeper).await;
                waker_log.push(format!("waker {:?}", woke));
                0
            },
            "",
            STACK,
            4,
        )
        .await
        .unwrap();

        // Zap does not wake the sleeper; the waker has to
        let resumed = k.zap(sleeper).await;
        rec.push(format!("zap {}", resumed.code()));

        k.join().await.unwrap();
        k.join().await.unwrap();
        0
    });

    assert!(report.is_clean());
    assert_eq!(
        log.events(),
        vec!["sleeper -1", "zap 0", "waker Ok(Normal)"]
    );
}

#[test]
fn test_join_reports_zapped_caller() {
    let kernel = kernel();
    let log = Recorder::new();
    let rec = log.clone();

    let report = kernel.startup(move |k: Kernel, _arg: String| async move {
        let parent_log = rec.clone();
        let parent = k
            .fork(
                "parent",
                move |k: Kernel, _arg: String| async move {
                    k.fork(
                        "child",
                        |k: Kernel, _arg: String| async move {
                            k.execute(10_000).await;
                            0
                        },
                        "",
                        STACK,
                        4,
                    )
                    .await
                    .unwrap();
                    let joined = k.join().await.unwrap();
                    parent_log.push(format!("{:?} {}", joined.resumed, joined.code()));
                    parent_log.push(format!("still zapped {}", k.is_zapped()));
                    0
                },
                "",
                STACK,
                3,
            )
            .await
            .unwrap();

        let resumed = k.zap(parent).await;
        rec.push(format!("zap {:?}", resumed));
        let joined = k.join().await.unwrap();
        rec.push(format!("joined {}", joined.pid));
        0
    });

    assert!(report.is_clean());
    assert_eq!(
        log.events(),
        vec![
            "Zapped -1",
            "still zapped true",
            "zap Normal",
            "joined 3",
        ]
    );
}

#[test]
fn test_zap_does_not_mark_the_zapper() {
    let kernel = kernel();
    let log = Recorder::new();
    let rec = log.clone();

    kernel.startup(move |k: Kernel, _arg: String| async move {
        let child = k
            .fork(
                "child",
                |k: Kernel, _arg: String| async move {
                    k.execute(1_000).await;
                    0
                },
                "",
                STACK,
                3,
            )
            .await
            .unwrap();

        let resumed = k.zap(child).await;
        rec.push(format!("{} {}", resumed == Resumed::Normal, k.is_zapped()));
        let info = k.process(child).unwrap();
        rec.push(format!("{} {}", info.status, info.zapped));
        k.join().await.unwrap();
        0
    });

    assert_eq!(log.events(), vec!["true false", "QUIT true"]);
}
