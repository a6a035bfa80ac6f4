/*!
 * Scheduler Tests
 * Priority dispatch, quantum preemption, CPU accounting and idle-time halts
 */

mod common;

use common::{config, kernel, kernel_with, Recorder, STACK};
use futures::future::BoxFuture;
use futures::FutureExt;
use pretty_assertions::assert_eq;
use sim_kernel::{ConfigError, HaltReason, Kernel, ProcessStatus};

/// Child that logs its name when it first runs
fn announce(
    log: &Recorder,
    name: &'static str,
) -> impl FnOnce(Kernel, String) -> BoxFuture<'static, i32> + Send + 'static {
    let log = log.clone();
    move |_k: Kernel, _arg: String| {
        async move {
            log.push(name);
            0
        }
        .boxed()
    }
}

#[test]
fn test_most_urgent_priority_runs_first() {
    let kernel = kernel();
    let log = Recorder::new();
    let rec = log.clone();

    let report = kernel.startup(move |k: Kernel, _arg: String| async move {
        k.fork("five", announce(&rec, "five"), "", STACK, 5).await.unwrap();
        k.fork("three", announce(&rec, "three"), "", STACK, 3).await.unwrap();
        k.fork("four", announce(&rec, "four"), "", STACK, 4).await.unwrap();
        rec.push("start1 forked all");
        for _ in 0..3 {
            k.join().await.unwrap();
        }
        0
    });

    assert!(report.is_clean());
    assert_eq!(
        log.events(),
        vec!["start1 forked all", "three", "four", "five"]
    );
}

#[test]
fn test_equal_priority_runs_in_fork_order() {
    let kernel = kernel();
    let log = Recorder::new();
    let rec = log.clone();

    kernel.startup(move |k: Kernel, _arg: String| async move {
        for name in ["a", "b", "c"] {
            k.fork(name, announce(&rec, name), "", STACK, 3).await.unwrap();
        }
        rec.push(format!("{:?}", k.ready_queue(3)));
        for _ in 0..3 {
            k.join().await.unwrap();
        }
        0
    });

    assert_eq!(log.events(), vec!["[3, 4, 5]", "a", "b", "c"]);
}

#[test]
fn test_quantum_expiry_round_robins_equal_priorities() {
    let kernel = kernel();
    let log = Recorder::new();
    let rec = log.clone();

    let report = kernel.startup(move |k: Kernel, _arg: String| async move {
        for name in ["A", "B", "C"] {
            let worker_log = rec.clone();
            k.fork(
                name,
                move |k: Kernel, _arg: String| async move {
                    for _ in 0..3 {
                        k.execute(80_000).await;
                        worker_log.push(name);
                    }
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
    assert_eq!(
        log.events(),
        vec!["A", "B", "C", "A", "B", "C", "A", "B", "C"]
    );
}

#[test]
fn test_shorter_quantum_from_config() {
    let kernel = kernel_with(config().with_quantum(40_000));
    let log = Recorder::new();
    let rec = log.clone();

    kernel.startup(move |k: Kernel, _arg: String| async move {
        for name in ["A", "B"] {
            let worker_log = rec.clone();
            k.fork(
                name,
                move |k: Kernel, _arg: String| async move {
                    for _ in 0..2 {
                        k.execute(40_000).await;
                        worker_log.push(name);
                    }
                    0
                },
                "",
                STACK,
                2,
            )
            .await
            .unwrap();
        }
        k.join().await.unwrap();
        k.join().await.unwrap();
        0
    });

    assert_eq!(log.events(), vec!["A", "B", "A", "B"]);
}

#[test]
fn test_quantum_expiry_never_yields_to_lower_priority() {
    let kernel = kernel();
    let log = Recorder::new();
    let rec = log.clone();

    kernel.startup(move |k: Kernel, _arg: String| async move {
        let worker_log = rec.clone();
        k.fork(
            "hog",
            move |k: Kernel, _arg: String| async move {
                k.execute(300_000).await;
                worker_log.push("hog done");
                0
            },
            "",
            STACK,
            3,
        )
        .await
        .unwrap();
        k.fork("low", announce(&rec, "low"), "", STACK, 4).await.unwrap();
        k.join().await.unwrap();
        k.join().await.unwrap();
        0
    });

    assert_eq!(log.events(), vec!["hog done", "low"]);
}

#[test]
fn test_disabled_interrupts_suppress_preemption() {
    let kernel = kernel();
    let log = Recorder::new();
    let rec = log.clone();

    kernel.startup(move |k: Kernel, _arg: String| async move {
        let a_log = rec.clone();
        k.fork(
            "A",
            move |k: Kernel, _arg: String| async move {
                k.disable_interrupts().unwrap();
                k.execute(200_000).await;
                a_log.push("A");
                k.enable_interrupts().unwrap();
                0
            },
            "",
            STACK,
            3,
        )
        .await
        .unwrap();
        k.fork("B", announce(&rec, "B"), "", STACK, 3).await.unwrap();
        k.join().await.unwrap();
        k.join().await.unwrap();
        0
    });

    assert_eq!(log.events(), vec!["A", "B"]);
}

#[test]
fn test_clock_and_quantum_start() {
    let kernel = kernel();
    let log = Recorder::new();
    let rec = log.clone();

    kernel.startup(move |k: Kernel, _arg: String| async move {
        rec.push(format!("{:?}", k.read_cur_start_time()));
        k.execute(10_000).await;
        rec.push(k.read_time().to_string());
        k.time_slice().await;
        rec.push(format!("{}", k.getpid()));
        0
    });

    assert_eq!(log.events(), vec!["Some(0)", "10000", "2"]);
    assert_eq!(kernel.getpid(), 1);
}

#[test]
fn test_cpu_time_charged_until_block_then_deadlock() {
    let kernel = kernel();
    let report = kernel.startup(|k: Kernel, _arg: String| async move {
        k.fork(
            "stuck",
            |k: Kernel, _arg: String| async move {
                k.execute(50_000).await;
                k.block_me(20).await;
                0
            },
            "",
            STACK,
            3,
        )
        .await
        .unwrap();
        k.join().await.unwrap();
        0
    });

    assert_eq!(report.code, 1);
    assert_eq!(report.reason, HaltReason::Deadlock { blocked: 2 });

    let stuck = kernel.process(3).unwrap();
    assert_eq!(stuck.status, ProcessStatus::Blocked(20));
    assert_eq!(stuck.cpu_time, 50_000);
    assert_eq!(
        kernel.process(2).map(|p| p.status),
        Some(ProcessStatus::JoinBlocked)
    );
    assert!(kernel
        .transcript()
        .iter()
        .any(|line| line.starts_with("check_deadlock(): 3 processes remain")));
}

#[test]
fn test_user_mode_primitive_halts() {
    let kernel = kernel();
    let report = kernel.startup(|k: Kernel, _arg: String| async move {
        k.enter_user_mode();
        assert!(k.disable_interrupts().is_err());
        let _ = k.fork("never", |_k: Kernel, _arg: String| async { 0 }, "", STACK, 3).await;
        0
    });

    assert_eq!(report.code, 1);
    assert_eq!(
        report.reason,
        HaltReason::UserMode {
            op: "fork",
            pid: Some(2)
        }
    );
    assert_eq!(kernel.process(2).map(|p| p.kids), Some(0));
}

#[test]
fn test_kernel_mode_can_be_restored() {
    let kernel = kernel();
    let report = kernel.startup(|k: Kernel, _arg: String| async move {
        k.enter_user_mode();
        k.enter_kernel_mode();
        k.fork("fine", |_k: Kernel, _arg: String| async { 0 }, "", STACK, 3)
            .await
            .unwrap();
        k.join().await.unwrap();
        0
    });

    assert!(report.is_clean());
}

#[test]
fn test_custom_idle_process() {
    let kernel = kernel();
    let log = Recorder::new();
    let rec = log.clone();

    let report = kernel.startup_with_idle(
        move |k: Kernel, _arg: String| async move {
            rec.push(format!("idle {}", k.count_processes()));
            k.check_deadlock().await;
            0
        },
        |_k: Kernel, _arg: String| async { 0 },
    );

    assert!(report.is_clean());
    assert_eq!(log.events(), vec!["idle 1"]);
}

#[test]
fn test_startup_twice_halts() {
    let kernel = kernel();
    let first = kernel.startup(|_k: Kernel, _arg: String| async { 0 });
    let second = kernel.startup(|_k: Kernel, _arg: String| async { 0 });

    assert!(first.is_clean());
    assert_eq!(second.code, 1);
    assert_eq!(second.reason, HaltReason::AlreadyStarted);
    // The machine keeps the halt of the run that actually happened
    assert_eq!(kernel.halt_report(), Some(first));
    assert_eq!(
        kernel.transcript().last().map(String::as_str),
        Some("FATAL: Kernel has already been started")
    );
}

#[test]
fn test_zero_clock_period_is_rejected_at_build() {
    let result = Kernel::builder()
        .with_config(config().with_clock_period(0))
        .build();
    let err = result.unwrap_err();
    assert_eq!(
        err,
        ConfigError::InvalidValue {
            field: "clock_period_us",
            reason: "must be positive".to_string(),
        }
    );
}

#[test]
fn test_dump_lists_live_processes() {
    let kernel = kernel();
    kernel.startup(|k: Kernel, _arg: String| async move {
        k.fork("dumped", |_k: Kernel, _arg: String| async { 0 }, "", STACK, 3)
            .await
            .unwrap();
        k.dump_processes();
        k.join().await.unwrap();
        0
    });

    let transcript = kernel.transcript();
    assert!(transcript[0].starts_with("SLOT"));
    let rows: Vec<Vec<&str>> = transcript[1..4]
        .iter()
        .map(|line| line.split_whitespace().collect())
        .collect();
    assert_eq!(rows[0][2], "sentinel");
    assert_eq!(rows[1][2], "start1");
    assert_eq!(rows[1][5], "RUNNING");
    assert_eq!(rows[2][2], "dumped");
    assert_eq!(rows[2][3], "2");
    assert_eq!(rows[2][5], "READY");
}

#[test]
fn test_debug_summarizes_live_state() {
    let kernel = kernel();
    let log = Recorder::new();
    let rec = log.clone();

    kernel.startup(move |k: Kernel, _arg: String| async move {
        k.fork("child", |_k: Kernel, _arg: String| async { 0 }, "", STACK, 5)
            .await
            .unwrap();
        rec.push(format!("{:?}", k));
        k.join().await.unwrap();
        0
    });

    let during = &log.events()[0];
    assert!(during.contains("current: Some(2)"), "{}", during);
    assert!(during.contains("processes: 3"), "{}", during);
    assert!(during.contains("halted: false"), "{}", during);
    assert!(format!("{:?}", kernel).contains("halted: true"));
}
