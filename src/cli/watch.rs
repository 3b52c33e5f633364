use std::collections::HashSet;

use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use timevault::engine::VaultUpdate;
use timevault::error::Result;
use timevault::vault::{Status, VaultId, VaultView};

use crate::cli::common::{self, Context};
use crate::cli::list::{remaining_label, status_label};

/// Stream status changes until every followed countdown has finished.
pub async fn run(ctx: &Context, id: Option<&str>) -> Result<()> {
    let only = id.map(common::parse_id).transpose()?;
    let directory = ctx.open_directory().await?;
    if let Some(id) = only {
        // Fails early for unknown or foreign ids.
        directory.get(id).await?;
    }

    let (initial, mut rx) = directory.subscribe();
    let follows = |vault_id: VaultId| only.map(|o| o == vault_id).unwrap_or(true);

    for view in initial.iter().filter(|v| follows(v.id)) {
        print_view(ctx, view)?;
    }
    let mut pending = countdowns(&initial, only);
    if pending.is_empty() {
        if !ctx.json {
            eprintln!("No countdown running.");
        }
        directory.shutdown();
        return Ok(());
    }

    loop {
        tokio::select! {
            update = rx.recv() => match update {
                Ok(update) if follows(update.vault_id()) => {
                    match &update {
                        VaultUpdate::Changed(view) => {
                            print_view(ctx, view)?;
                            if view.status == Status::Revealing {
                                pending.insert(view.id);
                            } else {
                                pending.remove(&view.id);
                            }
                        }
                        VaultUpdate::Removed { vault_id } => {
                            if ctx.json {
                                common::print_json(&update)?;
                            } else {
                                println!("{}  removed", vault_id);
                            }
                            pending.remove(vault_id);
                        }
                    }
                    if pending.is_empty() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(missed)) => {
                    // The dropped updates may have ended countdowns; start
                    // over from the session's current view.
                    warn!(missed, "watch fell behind, rereading");
                    let views = directory.list();
                    for view in views.iter().filter(|v| follows(v.id)) {
                        print_view(ctx, view)?;
                    }
                    pending = countdowns(&views, only);
                    if pending.is_empty() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    directory.shutdown();
    Ok(())
}

/// Ids of the followed vaults whose countdown is still running.
fn countdowns(views: &[VaultView], only: Option<VaultId>) -> HashSet<VaultId> {
    views
        .iter()
        .filter(|v| only.map(|o| o == v.id).unwrap_or(true))
        .filter(|v| v.status == Status::Revealing)
        .map(|v| v.id)
        .collect()
}

fn print_view(ctx: &Context, view: &VaultView) -> Result<()> {
    if ctx.json {
        return common::print_json(&VaultUpdate::Changed(view.clone()));
    }
    println!(
        "{}  {}  {:>14}  {}",
        view.id,
        status_label(view.status),
        remaining_label(view),
        view.title
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use timevault::vault::{NewVault, OwnerId, RevealStamps};

    fn view(revealing: bool) -> VaultView {
        let now = Utc::now();
        let mut vault = NewVault::new("v", "s", 30)
            .into_vault(OwnerId::new("o"), now)
            .unwrap();
        if revealing {
            vault.set_stamps(RevealStamps {
                reveal_requested_at: Some(now),
                revealed_at: None,
            });
        }
        VaultView::of(&vault, now)
    }

    #[test]
    fn test_countdowns_follow_running_vaults_only() {
        let running = view(true);
        let idle = view(false);
        let other = view(true);
        let views = vec![running.clone(), idle.clone(), other.clone()];

        let all = countdowns(&views, None);
        assert_eq!(all, HashSet::from([running.id, other.id]));
        assert_eq!(countdowns(&views, Some(running.id)), HashSet::from([running.id]));
        assert!(countdowns(&views, Some(idle.id)).is_empty());
    }
}
