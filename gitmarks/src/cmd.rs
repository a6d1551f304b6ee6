//! One-shot subcommands for classroom administration.
//!
//! Each talks to the API directly, prints to stdout and exits; the terminal
//! UI never starts. Formatting lives in plain functions returning `String`
//! so it can be tested without a server.

use std::path::{Path, PathBuf};

use clap::{Subcommand, ValueEnum};
use gitmarks_core::api::{classrooms, orgs, rubrics, ApiClient};
use gitmarks_core::db;
use gitmarks_core::error::{ApiError, DraftError};
use gitmarks_core::rubric::{signed_points, ItemImpact};
use gitmarks_core::types::{Classroom, ClassroomRole, FullRubric, InstallationsResponse, Rubric, RubricItem};
use gitmarks_core::validation::validate_repo_name;
use serde::Deserialize;
use thiserror::Error;
use tokio_rusqlite::Connection;

#[derive(Error, Debug)]
pub enum CmdError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{0:?} is not a valid classroom name")]
    InvalidName(String),

    #[error("cannot read {}: {source}", path.display())]
    ReadRubric { path: PathBuf, source: std::io::Error },

    #[error("rubric file is not valid TOML: {0}")]
    RubricToml(#[from] toml::de::Error),

    #[error("invalid rubric: {0}")]
    InvalidRubric(String),

    #[error(transparent)]
    Drafts(#[from] DraftError),
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create, join and list classrooms; issue invite tokens.
    #[command(subcommand)]
    Classroom(ClassroomCmd),
    /// Organizations visible to the signed-in user.
    #[command(subcommand)]
    Org(OrgCmd),
    /// List, show and import rubrics.
    #[command(subcommand)]
    Rubric(RubricCmd),
}

#[derive(Subcommand, Debug)]
pub enum ClassroomCmd {
    /// Create a classroom in a GitHub organization.
    Create {
        /// Organization login.
        #[arg(long)]
        org: String,
        #[arg(long)]
        name: String,
    },
    /// Join a classroom with an invite token and make it the default.
    Join { token: String },
    /// Issue an invite token.
    Token {
        #[arg(long)]
        classroom: i64,
        #[arg(long, value_enum, default_value_t = RoleArg::Student)]
        role: RoleArg,
        /// Minutes until the token expires; never when omitted.
        #[arg(long)]
        duration: Option<i64>,
    },
    /// Classrooms of an organization.
    List {
        #[arg(long)]
        org_id: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum OrgCmd {
    List,
}

#[derive(Subcommand, Debug)]
pub enum RubricCmd {
    /// Rubrics reusable in a classroom.
    List {
        #[arg(long)]
        classroom: i64,
    },
    Show { id: i64 },
    /// Create a rubric from a TOML file, or replace an existing one.
    Import {
        file: PathBuf,
        /// Rubric id to replace.
        #[arg(long)]
        update: Option<i64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    Student,
    Ta,
    Professor,
}

impl From<RoleArg> for ClassroomRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Student => ClassroomRole::Student,
            RoleArg::Ta => ClassroomRole::Ta,
            RoleArg::Professor => ClassroomRole::Professor,
        }
    }
}

/// Runs `command`. `drafts` is where a joined classroom is remembered.
pub async fn run(command: Command, client: &ApiClient, drafts: Option<&Connection>) -> Result<(), CmdError> {
    tracing::info!(?command, "running command");
    match command {
        Command::Classroom(ClassroomCmd::Create { org, name }) => {
            let classroom = create_classroom(client, &org, &name).await?;
            println!("Created {}", classroom_line(&classroom));
        }
        Command::Classroom(ClassroomCmd::Join { token }) => {
            let joined = classrooms::redeem_token(client, &token).await?;
            println!("{}", joined.message);
            println!(
                "Joined {} as {}",
                classroom_line(&joined.classroom),
                joined.classroom_user.classroom_role.as_str()
            );
            if let (Some(conn), Some(id)) = (drafts, joined.classroom.id) {
                db::set_preference(conn, db::SELECTED_CLASSROOM, &id.to_string()).await?;
            }
        }
        Command::Classroom(ClassroomCmd::Token { classroom, role, duration }) => {
            let token = classrooms::create_token(client, classroom, role.into(), duration).await?;
            println!("{}", token.token);
            if let Some(expires) = token.expires_at {
                println!("expires {expires}");
            }
            println!("Redeem with: gitmarks classroom join {}", token.token);
        }
        Command::Classroom(ClassroomCmd::List { org_id }) => {
            let listing = orgs::classrooms(client, org_id).await?;
            for classroom in &listing.classrooms {
                println!("{}", classroom_line(classroom));
            }
        }
        Command::Org(OrgCmd::List) => {
            let installs = orgs::installations(client).await?;
            print!("{}", installations_text(&installs));
        }
        Command::Rubric(RubricCmd::List { classroom }) => {
            for rubric in classrooms::rubrics(client, classroom).await? {
                println!("{}", rubric_line(&rubric));
            }
        }
        Command::Rubric(RubricCmd::Show { id }) => {
            let rubric = rubrics::get(client, id).await?;
            print!("{}", rubric_text(&rubric));
        }
        Command::Rubric(RubricCmd::Import { file, update }) => {
            let rubric = read_rubric(&file)?;
            let saved = match update {
                Some(id) => rubrics::update(client, id, &rubric).await?,
                None => rubrics::create(client, &rubric).await?,
            };
            println!("Saved {}", rubric_line(&saved));
        }
    }
    Ok(())
}

async fn create_classroom(client: &ApiClient, org: &str, name: &str) -> Result<Classroom, CmdError> {
    if !validate_repo_name(name) {
        return Err(CmdError::InvalidName(name.to_owned()));
    }
    let org = orgs::details(client, org).await?;
    let classroom = Classroom {
        id: None,
        name: name.to_owned(),
        org_id: org.id,
        org_name: org.login,
        created_at: None,
    };
    Ok(classrooms::create(client, &classroom).await?)
}

fn classroom_line(classroom: &Classroom) -> String {
    match classroom.id {
        Some(id) => format!("{} ({}, id {id})", classroom.name, classroom.org_name),
        None => format!("{} ({})", classroom.name, classroom.org_name),
    }
}

fn installations_text(installs: &InstallationsResponse) -> String {
    let mut out = String::new();
    for org in &installs.orgs_with_app {
        out.push_str(&format!("{:<8} {}\n", org.id, org.login));
    }
    for org in &installs.orgs_without_app {
        out.push_str(&format!("{:<8} {} (app not installed)\n", org.id, org.login));
    }
    out
}

fn rubric_line(rubric: &FullRubric) -> String {
    let id = rubric.rubric.id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_owned());
    format!("{id:<8} {} ({} items)", rubric.rubric.name, rubric.rubric_items.len())
}

fn rubric_text(rubric: &FullRubric) -> String {
    let mut out = format!("{}\n", rubric.rubric.name);
    for item in &rubric.rubric_items {
        let impact = ItemImpact::of(item.point_value);
        let points = item.point_value.unwrap_or(0).abs();
        out.push_str(&format!("  {}{points:<3} {}\n", impact.symbol(), item.explanation));
    }
    out
}

/// On-disk rubric: a header plus `[[item]]` tables. Points are entered
/// unsigned; `impact` decides the sign.
#[derive(Debug, Deserialize)]
struct RubricFile {
    name: String,
    org_id: i64,
    classroom_id: i64,
    #[serde(default)]
    reusable: bool,
    #[serde(default, rename = "item")]
    items: Vec<RubricFileItem>,
}

#[derive(Debug, Deserialize)]
struct RubricFileItem {
    explanation: String,
    #[serde(default)]
    points: i64,
    #[serde(default)]
    impact: ItemImpact,
}

fn read_rubric(path: &Path) -> Result<FullRubric, CmdError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CmdError::ReadRubric {
        path: path.to_owned(),
        source,
    })?;
    parse_rubric(&raw)
}

fn parse_rubric(raw: &str) -> Result<FullRubric, CmdError> {
    let file: RubricFile = toml::from_str(raw)?;
    if file.name.trim().is_empty() {
        return Err(CmdError::InvalidRubric("name is empty".to_owned()));
    }
    if file.items.is_empty() {
        return Err(CmdError::InvalidRubric("no items".to_owned()));
    }
    let mut rubric_items = Vec::with_capacity(file.items.len());
    for (i, item) in file.items.into_iter().enumerate() {
        if item.explanation.trim().is_empty() {
            return Err(CmdError::InvalidRubric(format!("item {} has no explanation", i + 1)));
        }
        rubric_items.push(RubricItem {
            point_value: signed_points(item.points, item.impact),
            explanation: item.explanation,
            ..RubricItem::default()
        });
    }
    Ok(FullRubric {
        rubric: Rubric {
            id: None,
            name: file.name,
            org_id: file.org_id,
            classroom_id: file.classroom_id,
            reusable: file.reusable,
        },
        rubric_items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct Cli {
        #[command(subcommand)]
        command: Command,
    }

    const STYLE: &str = r#"
        name = "Style"
        org_id = 7
        classroom_id = 3
        reusable = true

        [[item]]
        explanation = "Unclear naming"
        points = 2
        impact = "deduction"

        [[item]]
        explanation = "Thorough tests"
        points = -3
        impact = "addition"

        [[item]]
        explanation = "See the style guide"
        points = 5
    "#;

    #[test]
    fn rubric_file_signs_points_by_impact() {
        let rubric = parse_rubric(STYLE).unwrap();
        assert_eq!(rubric.rubric.name, "Style");
        assert!(rubric.rubric.reusable);
        let points: Vec<_> = rubric.rubric_items.iter().map(|i| i.point_value).collect();
        assert_eq!(points, [Some(-2), Some(3), None]);
    }

    #[test]
    fn rubric_file_rejects_blank_items() {
        let raw = "name = \"Style\"\norg_id = 1\nclassroom_id = 1\n[[item]]\nexplanation = \" \"\n";
        let err = parse_rubric(raw).unwrap_err();
        assert_eq!(err.to_string(), "invalid rubric: item 1 has no explanation");

        let raw = "name = \"Style\"\norg_id = 1\nclassroom_id = 1\n";
        assert!(matches!(parse_rubric(raw), Err(CmdError::InvalidRubric(_))));
        assert!(matches!(parse_rubric("name = ["), Err(CmdError::RubricToml(_))));
    }

    #[test]
    fn shown_rubric_lists_signed_items() {
        let rubric = parse_rubric(STYLE).unwrap();
        assert_eq!(
            rubric_text(&rubric),
            "Style\n  -2   Unclear naming\n  +3   Thorough tests\n  ~0   See the style guide\n"
        );
        assert_eq!(rubric_line(&rubric), "-        Style (3 items)");
    }

    #[test]
    fn installations_mark_orgs_without_the_app() {
        let installs: InstallationsResponse = serde_json::from_value(serde_json::json!({
            "orgs_with_app": [{"id": 1, "login": "cs3500"}],
            "orgs_without_app": [{"id": 2, "login": "scratch"}]
        }))
        .unwrap();
        assert_eq!(installations_text(&installs), "1        cs3500\n2        scratch (app not installed)\n");
    }

    #[test]
    fn token_role_defaults_to_student() {
        let cli = Cli::try_parse_from(["gitmarks", "classroom", "token", "--classroom", "4"]).unwrap();
        let Command::Classroom(ClassroomCmd::Token { classroom, role, duration }) = &cli.command else {
            panic!("parsed {:?}", cli.command);
        };
        assert_eq!((*classroom, ClassroomRole::from(*role), *duration), (4, ClassroomRole::Student, None));

        let cli = Cli::try_parse_from(["gitmarks", "classroom", "token", "--classroom", "4", "--role", "ta"]).unwrap();
        assert!(matches!(cli.command, Command::Classroom(ClassroomCmd::Token { role: RoleArg::Ta, .. })));
    }

    #[tokio::test]
    async fn invalid_classroom_name_never_reaches_the_server() {
        let client = ApiClient::new("http://127.0.0.1:9", None).unwrap();
        let err = create_classroom(&client, "cs3500", "fall/2026").await.unwrap_err();
        assert!(matches!(err, CmdError::InvalidName(name) if name == "fall/2026"));
    }
}
