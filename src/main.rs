#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # thinkink
//!
//! Command line front end: grade a submission against a stored assignment,
//! draft assignment material, or chat with the tutor.
//!
//! Reads `OPENAI_ENDPOINT`, `OPENAI_API_KEY` and `OPENAI_MODEL` (and
//! optionally `SUPABASE_URL`/`SUPABASE_ANON_KEY`) from the environment or a
//! `.env` file.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use bpaf::*;
use dotenvy::dotenv;
use thinkink::{
    Assignment, AssignmentStore, ChatMessage, Grader, MemoryStore,
    authoring::{
        generate_detailed_instructions, generate_examples, generate_grader_prompt,
        generate_learning_goals, generate_system_prompt,
    },
    config::Config,
    placement::render_ansi,
    prompts::AssignmentContext,
    rubric::rubric_total,
    tutor::Tutor,
};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tracing::{Level, metadata::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

/// Title and goal of an assignment being authored.
#[derive(Debug, Clone)]
struct Draft {
    /// Assignment title
    title: String,
    /// Assignment goal
    goal:  String,
}

/// Top-level CLI commands.
#[derive(Debug, Clone)]
enum Cmd {
    /// Grade a submission
    Grade {
        /// JSON file of assignment documents
        assignments: Option<PathBuf>,
        /// Read assignments from Supabase instead
        supabase:    bool,
        /// Assignment id
        id:          String,
        /// Print the result as JSON
        json:        bool,
        /// Path to the submission, or `-` for stdin
        submission:  String,
    },
    /// Generate examples, instructions and a rubric
    Rubric(Draft),
    /// Generate strong and weak examples
    Examples(Draft),
    /// Generate learning goals
    Goals(Draft),
    /// Generate a tutor system prompt
    TutorPrompt(Draft),
    /// Generate a grader prompt
    GraderPrompt(Draft),
    /// Chat with the tutor
    Tutor,
}

/// Parsed command line.
#[derive(Debug, Clone)]
struct Opts {
    /// Enable debug logging
    verbose: bool,
    /// Command to run
    cmd:     Cmd,
}

/// Parse the command line arguments and return an `Opts` struct
fn options() -> Opts {
    /// parses title and goal of an assignment
    fn draft() -> impl Parser<Draft> {
        let title = positional::<String>("TITLE").help("Assignment title");
        let goal = positional::<String>("GOAL").help("What the assignment should teach");
        construct!(Draft { title, goal })
    }

    let grade = {
        let assignments = long("assignments")
            .short('a')
            .help("JSON file holding an array of assignment documents")
            .argument::<PathBuf>("FILE")
            .optional();
        let supabase = long("supabase")
            .help("Read the assignment from Supabase instead of a file")
            .switch();
        let id = long("id")
            .help("Id of the assignment to grade against")
            .argument::<String>("ID");
        let json = long("json").help("Print the grading result as JSON").switch();
        let submission = positional::<String>("SUBMISSION")
            .help("Path to the submission, or - to read it from stdin");
        construct!(Cmd::Grade {
            assignments,
            supabase,
            id,
            json,
            submission
        })
        .to_options()
        .command("grade")
        .help("Grade a submission against an assignment's rubric")
    };

    let rubric = construct!(Cmd::Rubric(draft()))
        .to_options()
        .command("rubric")
        .help("Draft examples, instructions and a rubric");

    let examples = construct!(Cmd::Examples(draft()))
        .to_options()
        .command("examples")
        .help("Draft two strong and two weak examples");

    let goals = construct!(Cmd::Goals(draft()))
        .to_options()
        .command("goals")
        .help("Draft learning goals");

    let tutor_prompt = construct!(Cmd::TutorPrompt(draft()))
        .to_options()
        .command("tutor-prompt")
        .help("Draft a system prompt for an assignment tutor");

    let grader_prompt = construct!(Cmd::GraderPrompt(draft()))
        .to_options()
        .command("grader-prompt")
        .help("Draft a grader prompt");

    let tutor = pure(Cmd::Tutor)
        .to_options()
        .command("tutor")
        .help("Chat with the tutor on stdin");

    let verbose = short('v')
        .long("verbose")
        .help("Log every LLM call")
        .switch();
    let cmd = construct!([grade, rubric, examples, goals, tutor_prompt, grader_prompt, tutor]);

    construct!(Opts { verbose, cmd })
        .to_options()
        .descr("Rubric-grounded essay grading")
        .run()
}

/// Reads the submission from `path`, or stdin when `path` is `-`.
async fn read_submission(path: &str) -> Result<String> {
    if path == "-" {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("Could not read submission from stdin")?;
        Ok(text)
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Could not read submission {path}"))
    }
}

/// Lowercase, dash-separated id derived from an assignment title.
fn slug(title: &str) -> String {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Runs the `grade` command.
async fn grade(
    config: &Config,
    assignments: Option<PathBuf>,
    supabase: bool,
    id: String,
    json: bool,
    submission: String,
) -> Result<()> {
    let store: Arc<dyn AssignmentStore> = if supabase {
        Arc::new(config.postgrest_store()?)
    } else {
        let path = assignments.context("Pass --assignments <FILE> or --supabase")?;
        Arc::new(
            MemoryStore::from_file(&path)
                .await
                .with_context(|| format!("Could not load assignments from {}", path.display()))?,
        )
    };

    let text = read_submission(&submission).await?;
    let grader = Grader::new(store, Arc::new(config.openai_backend()?)).with_prompts(config.prompts());
    let assignment = grader
        .assignment(&id)
        .await
        .with_context(|| format!("Could not load assignment {id}"))?;
    let result = grader
        .grade_assignment(&assignment, &text)
        .await
        .with_context(|| format!("Could not grade submission for assignment {id}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let out_of = Some(rubric_total(&assignment.rubric));
    println!("{}", result.criteria_table(out_of));
    println!("\n## Overall Feedback\n\n{}\n", result.overall_feedback);
    println!("## Annotated Submission\n\n{}", render_ansi(&result.segments(&text)));
    Ok(())
}

/// Runs the interactive `tutor` command until EOF or `exit`.
async fn tutor(config: &Config) -> Result<()> {
    let tutor = Tutor::new(Arc::new(config.openai_backend()?), &config.prompts());
    let mut history = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    eprintln!("Ask the tutor anything about your assignment (type `exit` to leave).");
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" {
            break;
        }

        history.push(ChatMessage::user(line));
        let reply = tutor.reply(&history).await?;
        println!("\n{reply}\n");
        history.push(ChatMessage::assistant(reply));
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let opts = options();

    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false);
    let filter_layer = LevelFilter::from_level(if opts.verbose { Level::DEBUG } else { Level::INFO });
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    let config = Config::from_env()?;
    let prompts = config.prompts();

    match opts.cmd {
        Cmd::Grade {
            assignments,
            supabase,
            id,
            json,
            submission,
        } => grade(&config, assignments, supabase, id, json, submission).await?,
        Cmd::Rubric(draft) => {
            let llm = config.openai_backend()?;
            let context = AssignmentContext {
                title: &draft.title,
                goal:  &draft.goal,
            };
            let examples = generate_examples(&llm, &prompts, context).await?;
            let (generated, learning_goals, system_prompt) = futures::try_join!(
                generate_detailed_instructions(&llm, &prompts, context, &examples),
                generate_learning_goals(&llm, &prompts, context),
                generate_system_prompt(&llm, &prompts, context),
            )?;
            let assignment = Assignment::builder()
                .id(slug(&draft.title))
                .title(draft.title.clone())
                .goal(draft.goal.clone())
                .instructions(generated.instructions)
                .examples(examples)
                .rubric(generated.rubric)
                .learning_goals(learning_goals)
                .system_prompt(system_prompt)
                .build();
            println!("{}", serde_json::to_string_pretty(&assignment)?);
        }
        Cmd::Examples(draft) => {
            let llm = config.openai_backend()?;
            let context = AssignmentContext {
                title: &draft.title,
                goal:  &draft.goal,
            };
            let examples = generate_examples(&llm, &prompts, context).await?;
            println!("{}", serde_json::to_string_pretty(&examples)?);
        }
        Cmd::Goals(draft) => {
            let llm = config.openai_backend()?;
            let context = AssignmentContext {
                title: &draft.title,
                goal:  &draft.goal,
            };
            for goal in generate_learning_goals(&llm, &prompts, context).await? {
                println!("- {goal}");
            }
        }
        Cmd::TutorPrompt(draft) => {
            let llm = config.openai_backend()?;
            let context = AssignmentContext {
                title: &draft.title,
                goal:  &draft.goal,
            };
            println!("{}", generate_system_prompt(&llm, &prompts, context).await?);
        }
        Cmd::GraderPrompt(draft) => {
            let llm = config.openai_backend()?;
            let context = AssignmentContext {
                title: &draft.title,
                goal:  &draft.goal,
            };
            println!("{}", generate_grader_prompt(&llm, &prompts, context).await?);
        }
        Cmd::Tutor => tutor(&config).await?,
    };

    Ok(())
}
