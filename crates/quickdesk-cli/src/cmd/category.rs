//! `qd category` — list and administer ticket categories.

use std::io::Write;
use std::path::Path;

use clap::{Args, Subcommand};
use quickdesk_core::Desk;
use quickdesk_core::error::{DeskError, EntityKind};
use quickdesk_core::model::{Category, CategoryPatch, NewCategory};
use quickdesk_core::store::BlobStore;
use quickdesk_core::view::category_ticket_counts;
use serde::Serialize;

use crate::actor;
use crate::cmd::{Workspace, check_actor, check_input, desk_fail};
use crate::output::{OutputMode, pretty_kv, pretty_section, render, render_mode, truncate};
use crate::validate;

const DEFAULT_COLOR: &str = "#3B82F6";

#[derive(Args, Debug)]
pub struct CategoryArgs {
    #[command(subcommand)]
    pub command: CategoryCommand,
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
    #[command(about = "List categories with ticket counts")]
    List,

    #[command(
        about = "Create a category (admin)",
        after_help = "EXAMPLES:\n    qd category create --name Hardware --color '#F97316'"
    )]
    Create(CategoryCreateArgs),

    #[command(about = "Edit a category (admin)")]
    Update(CategoryUpdateArgs),

    #[command(
        about = "Delete a category (admin)",
        long_about = "Delete a category. Tickets filed under it keep the old category id and show as uncategorized."
    )]
    Delete(CategoryDeleteArgs),
}

#[derive(Args, Debug)]
pub struct CategoryCreateArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long, default_value = "")]
    pub description: String,

    /// `#RRGGBB` badge color.
    #[arg(long, default_value = DEFAULT_COLOR)]
    pub color: String,
}

#[derive(Args, Debug)]
pub struct CategoryUpdateArgs {
    /// Category id or name.
    pub id: String,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub color: Option<String>,
}

#[derive(Args, Debug)]
pub struct CategoryDeleteArgs {
    /// Category id or name.
    pub id: String,
}

#[derive(Debug, Serialize)]
struct CategoryRow<'a> {
    #[serde(flatten)]
    category: &'a Category,
    tickets: usize,
}

/// Find a category by id, falling back to a case-insensitive name match.
fn find_category<'a, S: BlobStore>(desk: &'a Desk<S>, reference: &str) -> Option<&'a Category> {
    let reference = reference.trim();
    desk.category(reference).or_else(|| {
        desk.categories()
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(reference))
    })
}

/// Resolve a category reference, reporting an unknown one as not found.
pub fn resolve_category<S: BlobStore>(
    desk: &Desk<S>,
    reference: &str,
    output: OutputMode,
) -> anyhow::Result<Category> {
    find_category(desk, reference).cloned().ok_or_else(|| {
        desk_fail(
            output,
            &DeskError::NotFound {
                kind: EntityKind::Category,
                id: reference.trim().to_string(),
            },
        )
    })
}

pub fn run_category(
    args: &CategoryArgs,
    as_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    match &args.command {
        CategoryCommand::List => run_list(output, project_root),
        CategoryCommand::Create(create) => run_create(create, as_flag, output, project_root),
        CategoryCommand::Update(update) => run_update(update, as_flag, output, project_root),
        CategoryCommand::Delete(delete) => run_delete(delete, as_flag, output, project_root),
    }
}

fn run_list(output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let ws = Workspace::open(project_root, output)?;
    let counts = category_ticket_counts(ws.desk.categories(), ws.desk.tickets());
    let rows: Vec<CategoryRow<'_>> = ws
        .desk
        .categories()
        .iter()
        .map(|category| CategoryRow {
            category,
            tickets: counts.get(&category.id).copied().unwrap_or(0),
        })
        .collect();

    render_mode(
        output,
        &rows,
        |rows, w| {
            for row in rows {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}",
                    row.category.id, row.category.name, row.category.color, row.tickets
                )?;
            }
            Ok(())
        },
        |rows, w| {
            pretty_section(w, &format!("Categories ({})", rows.len()))?;
            for row in rows {
                writeln!(
                    w,
                    "{:<14} {:<20} {:<8} {:>4} tickets  {}",
                    row.category.id,
                    truncate(&row.category.name, 20),
                    row.category.color,
                    row.tickets,
                    truncate(&row.category.description, 30),
                )?;
            }
            Ok(())
        },
    )
}

fn render_category(output: OutputMode, category: &Category, headline: &str) -> anyhow::Result<()> {
    render(output, category, |c, w| {
        writeln!(w, "{headline}")?;
        pretty_kv(w, "id", &c.id)?;
        pretty_kv(w, "name", &c.name)?;
        pretty_kv(w, "color", &c.color)?;
        if !c.description.is_empty() {
            pretty_kv(w, "description", &c.description)?;
        }
        Ok(())
    })
}

fn run_create(
    args: &CategoryCreateArgs,
    as_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    check_input(output, validate::validate_name(&args.name))?;
    check_input(output, validate::validate_color(&args.color))?;

    let mut ws = Workspace::open(project_root, output)?;
    let admin = ws.actor(as_flag, output)?;
    check_actor(output, actor::require_admin(&admin, "create categories"))?;

    let data = NewCategory::new(args.name.trim(), args.description.trim(), &args.color);
    let category = ws
        .desk
        .create_category(data)
        .map_err(|e| desk_fail(output, &e))?;
    render_category(output, &category, &format!("✓ Created category {}", category.name))
}

fn run_update(
    args: &CategoryUpdateArgs,
    as_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    if let Some(name) = args.name.as_deref() {
        check_input(output, validate::validate_name(name))?;
    }
    if let Some(color) = args.color.as_deref() {
        check_input(output, validate::validate_color(color))?;
    }

    let mut ws = Workspace::open(project_root, output)?;
    let admin = ws.actor(as_flag, output)?;
    check_actor(output, actor::require_admin(&admin, "edit categories"))?;
    let target = resolve_category(&ws.desk, &args.id, output)?;

    let patch = CategoryPatch {
        name: args.name.as_deref().map(|s| s.trim().to_string()),
        description: args.description.as_deref().map(|s| s.trim().to_string()),
        color: args.color.clone(),
    };
    let category = ws
        .desk
        .update_category(&target.id, patch)
        .map_err(|e| desk_fail(output, &e))?;
    render_category(output, &category, &format!("✓ Updated category {}", category.name))
}

fn run_delete(
    args: &CategoryDeleteArgs,
    as_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let mut ws = Workspace::open(project_root, output)?;
    let admin = ws.actor(as_flag, output)?;
    check_actor(output, actor::require_admin(&admin, "delete categories"))?;
    let target = resolve_category(&ws.desk, &args.id, output)?;

    let removed = ws
        .desk
        .delete_category(&target.id)
        .map_err(|e| desk_fail(output, &e))?;
    render_category(output, &removed, &format!("✓ Deleted category {}", removed.name))
}
