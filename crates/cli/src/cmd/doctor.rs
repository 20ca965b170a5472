//! Check the partio installation for problems

use crate::config::Settings;
use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;
use partio_core::VersionControl;
use partio_git::HookState;

pub async fn run(settings: &Settings) -> Result<()> {
    let repo = util::open_repo()?;
    let mut problems = 0usize;
    let mut check = |ok: bool, message: String| {
        if ok {
            println!("{} {message}", "[OK]".green());
        } else {
            problems += 1;
            println!("{} {message}", "[WARN]".yellow());
        }
    };

    let initialized = util::partio_dir(repo.root()).is_dir();
    check(
        initialized,
        if initialized {
            ".partio directory exists".to_string()
        } else {
            ".partio directory missing (run 'partio enable')".to_string()
        },
    );

    for (name, state) in partio_git::hook_status(&repo) {
        let message = match state {
            HookState::Installed => format!("{name} hook installed"),
            HookState::Foreign => format!("{name} hook is not partio's (run 'partio enable')"),
            HookState::Missing => format!("{name} hook missing (run 'partio enable')"),
        };
        check(state == HookState::Installed, message);
    }

    let store = util::store(&repo, settings);
    let exists = store.exists()?;
    check(
        exists,
        if exists {
            format!("checkpoint branch {} exists", store.branch())
        } else {
            format!("checkpoint branch {} missing (run 'partio enable')", store.branch())
        },
    );

    println!();
    if problems == 0 {
        println!("{}", "Everything looks good.".green());
    } else {
        println!("{}", format!("{problems} problem(s) found.").yellow());
    }
    Ok(())
}
