/*!
 * Simulated Kernel - Main Entry Point
 *
 * Boots the process core on the simulated machine with a small workload:
 * a CPU-bound worker, a process that blocks until it is woken, and one
 * that is zapped while it waits on its own child.
 */

use miette::Result;
use sim_kernel::{init_tracing, Kernel, KernelConfig, KernelError};
use tracing::{info, warn};

const WORKER_PRIORITY: u8 = 3;
const SLEEP_STATUS: i32 = 20;

fn main() -> Result<()> {
    // Initialize structured tracing
    init_tracing();

    let config = KernelConfig::from_env().map_err(KernelError::from)?;
    let stack = config.min_stack;
    info!(?config, "Simulated kernel starting...");

    let kernel = Kernel::builder()
        .with_config(config)
        .build()
        .map_err(KernelError::from)?;

    let report = kernel.startup(move |k: Kernel, _arg: String| async move {
        let worker = k
            .fork(
                "worker",
                |k: Kernel, arg: String| async move {
                    let rounds: u64 = arg.parse().unwrap_or(1);
                    for _ in 0..rounds {
                        k.execute(25_000).await;
                    }
                    7
                },
                "4",
                stack,
                WORKER_PRIORITY,
            )
            .await;

        let sleeper = k
            .fork(
                "sleeper",
                |k: Kernel, _arg: String| async move {
                    let resumed = k.block_me(SLEEP_STATUS).await;
                    resumed.code()
                },
                "",
                stack,
                WORKER_PRIORITY,
            )
            .await;

        let victim = k
            .fork(
                "victim",
                move |k: Kernel, _arg: String| async move {
                    let grandchild = k
                        .fork(
                            "grandchild",
                            |k: Kernel, _arg: String| async move {
                                k.execute(60_000).await;
                                0
                            },
                            "",
                            stack,
                            5,
                        )
                        .await;
                    if grandchild.is_err() {
                        return k.quit(-1).await;
                    }
                    match k.join().await {
                        Ok(joined) if joined.resumed.is_zapped() => 99,
                        Ok(_) => 0,
                        Err(e) => e.legacy_code(),
                    }
                },
                "",
                stack,
                4,
            )
            .await;

        let (Ok(_worker), Ok(sleeper), Ok(victim)) = (worker, sleeper, victim) else {
            return k.quit(1).await;
        };

        k.dump_processes();

        // Everyone else runs while this process waits for the victim
        k.zap(victim).await;
        if let Err(e) = k.unblock_proc(sleeper).await {
            warn!(error = %e, "Could not wake the sleeper");
        }

        while let Ok(joined) = k.join().await {
            info!(child = joined.pid, status = joined.status, "Collected child");
        }

        k.dump_processes();
        0
    });

    info!(code = report.code, at = report.at, reason = %report.reason, "Machine halted");

    if report.is_clean() {
        Ok(())
    } else {
        Err(KernelError::Halted {
            code: report.code,
            reason: report.reason,
        }
        .into())
    }
}
