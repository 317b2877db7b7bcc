// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gt commit` - commit with the current agent's git identity

use anyhow::Result;
use clap::Args;

#[derive(Args)]
pub struct CommitArgs {
    /// Arguments passed through to `git commit`
    #[arg(allow_hyphen_values = true)]
    pub git_args: Vec<String>,
}

/// Author identity for an agent actor: the address as the name, a
/// derived address-shaped mailbox as the email.
pub fn identity_for(actor: &str) -> (String, String) {
    let slug: String = actor
        .chars()
        .map(|c| if c == '/' { '-' } else { c })
        .collect();
    (actor.to_string(), format!("{}@gastown.local", slug))
}

pub async fn handle(args: CommitArgs) -> Result<()> {
    let actor = crate::env::actor();
    let (name, email) = identity_for(&actor);

    // Git owns the terminal here (editor, hooks); propagate its exit
    // code rather than wrapping its output.
    let status = tokio::process::Command::new("git")
        .arg("-c")
        .arg(format!("user.name={}", name))
        .arg("-c")
        .arg(format!("user.email={}", email))
        .arg("commit")
        .args(&args.git_args)
        .status()
        .await?;

    if !status.success() {
        std::process::exit(status.code().unwrap_or(1));
    }
    Ok(())
}
