use clap::{Subcommand, ValueEnum};
use serde_json::json;

use crate::cli::config::Session;
use crate::cli::utils::{ensure_can, output_collection, output_error, output_success};
use crate::cli::OutputFormat;
use crate::models::SideMenuItem;
use crate::permission::build_permission_tree;
use crate::types::PageQuery;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

#[derive(Subcommand)]
pub enum PermissionCommands {
    #[command(about = "Check whether the current role holds a capability")]
    Can {
        #[arg(help = "Action, e.g. read or create")]
        action: String,
        #[arg(help = "Subject (menu name), e.g. Worksheet")]
        subject: String,
    },

    #[command(about = "List every capability of the current role")]
    List,

    #[command(about = "Show the menu/access matrix of a role")]
    Tree {
        #[arg(long, help = "Role id (defaults to the current user's role)")]
        role: Option<String>,
    },

    #[command(about = "Enable or disable one access of a role")]
    Set {
        #[arg(help = "Access id from `permission tree`")]
        access_id: String,
        #[arg(value_enum, help = "on or off")]
        state: Toggle,
    },

    #[command(about = "Show the navigation menu available to the current user")]
    Menu,

    #[command(about = "List roles")]
    Roles {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
        #[arg(long)]
        search: Option<String>,
    },
}

pub async fn handle(cmd: PermissionCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let session = Session::open().await?;

    match cmd {
        PermissionCommands::Can { action, subject } => {
            let allowed = session.can(&action, &subject);
            match output_format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "action": action,
                        "subject": subject,
                        "allowed": allowed,
                    }))?
                ),
                OutputFormat::Text => {
                    let verdict = if allowed { "can" } else { "cannot" };
                    println!("{} {} {} {}", session.user.username, verdict, action, subject);
                }
            }
            Ok(())
        }
        PermissionCommands::List => {
            let snapshot = session.ability.snapshot();
            let rules = snapshot.rules();
            let items = json!(rules
                .iter()
                .map(|c| json!({ "action": c.action, "subject": c.subject }))
                .collect::<Vec<_>>());
            let lines = rules.iter().map(|c| format!("{:<10} {}", c.action, c.subject)).collect();
            output_collection(&output_format, "capabilities", items, lines, "No capabilities granted")
        }
        PermissionCommands::Tree { role } => {
            if !ensure_can(&session, &output_format, "read", "Access")? {
                return Ok(());
            }
            let role_id = role.unwrap_or_else(|| session.user.role_id.clone());
            let permissions = session.client.permission_matrix(&role_id).await?;
            let tree = build_permission_tree(&permissions);

            match output_format {
                OutputFormat::Json => {
                    let rows: Vec<_> = tree
                        .rows()
                        .into_iter()
                        .map(|(node, depth)| {
                            json!({
                                "id": node.id,
                                "name": node.name,
                                "parent_id": node.parent_id,
                                "depth": depth,
                                "accesses": node.accesses,
                            })
                        })
                        .collect();
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({
                            "role_id": role_id,
                            "access_types": tree.access_types,
                            "menus": rows,
                            "orphans": tree.orphans,
                        }))?
                    );
                }
                OutputFormat::Text => {
                    print!("{:<32}", "Menu");
                    for access in &tree.access_types {
                        print!(" {:<8}", access);
                    }
                    println!();

                    for (node, depth) in tree.rows() {
                        let label = format!("{}{}", "  ".repeat(depth), node.name);
                        print!("{:<32}", label);
                        for access in &tree.access_types {
                            let cell = match node.access(access) {
                                Some(a) if a.granted() => "[x]",
                                Some(_) => "[ ]",
                                None => "-",
                            };
                            print!(" {:<8}", cell);
                        }
                        println!();
                    }
                    if !tree.orphans.is_empty() {
                        println!("Unresolved parents: {}", tree.orphans.join(", "));
                    }
                }
            }
            Ok(())
        }
        PermissionCommands::Set { access_id, state } => {
            if !ensure_can(&session, &output_format, "update", "Access")? {
                return Ok(());
            }
            let is_active = matches!(state, Toggle::On);
            match session.client.set_access_active(&access_id, is_active).await {
                Ok(message) => output_success(
                    &output_format,
                    &message,
                    Some(json!({ "access_id": access_id, "is_active": is_active })),
                ),
                Err(e) => output_error(&output_format, &e.to_string(), Some(e.error_code())),
            }
        }
        PermissionCommands::Menu => {
            let menu = session.client.side_menu().await?;
            let mut lines = Vec::new();
            for item in &menu {
                menu_lines(item, 0, &mut lines);
            }
            output_collection(&output_format, "menu", serde_json::to_value(&menu)?, lines, "No menu entries")
        }
        PermissionCommands::Roles { page, limit, search } => {
            if !ensure_can(&session, &output_format, "read", "Role")? {
                return Ok(());
            }
            let mut query = PageQuery::new(page, limit);
            if let Some(search) = search {
                query = query.with_search(search);
            }
            let roles = session.client.roles(&query).await?;
            let lines = roles
                .iter()
                .map(|r| format!("{:<26} {}", r.id, r.name))
                .collect();
            output_collection(&output_format, "roles", serde_json::to_value(&roles)?, lines, "No roles found")
        }
    }
}

fn menu_lines(item: &SideMenuItem, depth: usize, lines: &mut Vec<String>) {
    let marker = if item.is_active { "" } else { " (inactive)" };
    lines.push(format!("{}{} {}{}", "  ".repeat(depth), item.name, item.url, marker));
    for child in &item.children {
        menu_lines(child, depth + 1, lines);
    }
}
