use anyhow::{anyhow, Context};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal;
use std::io::{self, Write};
use std::path::PathBuf;
use syllabus_quiz::config::SourceConfig;
use syllabus_quiz::model::{OptionIndex, QuestionCount, QuestionOutcome, QuizSettings};
use syllabus_quiz::scoring::{format_duration, QuizResult};
use syllabus_quiz::session::QuizSession;
use syllabus_quiz::sources::SourceKind;
use tracing_subscriber::EnvFilter;

fn parse_count(s: &str) -> Result<QuestionCount, String> {
    let n: usize = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
    QuestionCount::try_from(n)
}

#[derive(Parser)]
#[command(author, version, about = "Turn a syllabus into a practice quiz", long_about = None)]
#[command(after_help = "ENVIRONMENT VARIABLES:
    QUIZ_SOURCE               Override question source (remote|deepseek|demo)
    QUIZ_SOURCE_URL           Question generation endpoint
    QUIZ_SOURCE_TIMEOUT_SECS  Request timeout for the endpoint
    DEEPSEEK_API_KEY          API key for the DeepSeek source

KEYS:
    a-d / 1-4    answer the current question
    n / ->       next question
    p / <-       previous question
    g            jump to a question number
    s            submit
    q / Esc      quit without scoring")]
struct Args {
    /// Syllabus document (.txt, .md, .pdf, .doc, .docx)
    file: PathBuf,

    /// Number of questions: 15, 20 or 30
    #[arg(short = 'n', long, default_value = "15", value_parser = parse_count)]
    questions: QuestionCount,

    /// Marks awarded per correct answer
    #[arg(long, default_value_t = 1.0)]
    marks: f64,

    /// Marks deducted per wrong answer
    #[arg(long, default_value_t = 0.25)]
    negative: f64,

    /// Question source: remote, deepseek, demo [default: auto-detect]
    #[arg(short, long)]
    source: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "syllabus_quiz=debug,quiz=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(io::stderr)
        .init();
}

/// Restores cooked mode when dropped.
struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Block until a single key is pressed.
fn read_key() -> io::Result<KeyCode> {
    let _raw = RawMode::enable()?;
    loop {
        if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
            if kind == KeyEventKind::Press {
                return Ok(code);
            }
        }
    }
}

fn read_line(prompt: &str) -> io::Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn render_question(session: &QuizSession) {
    let Some(quiz) = session.active() else { return };
    let total = quiz.questions().len();
    let question = quiz.current_question();

    println!();
    println!(
        "Question {} of {}  ({} answered)",
        quiz.current_index() + 1,
        total,
        quiz.answered_count()
    );
    println!("{}", question.prompt);
    for option in OptionIndex::ALL {
        let marker = if question.user_answer == Some(option) { '>' } else { ' ' };
        println!(" {} {}. {}", marker, option.label(), question.option(option));
    }
    if quiz.is_last() {
        println!("[last question: press s to submit]");
    }
}

/// Drive the answering loop. Returns `false` if the user quit.
fn run_quiz(session: &mut QuizSession) -> anyhow::Result<bool> {
    loop {
        render_question(session);
        match read_key()? {
            KeyCode::Char(c) if OptionIndex::from_key(c).is_some() => {
                if let Some(option) = OptionIndex::from_key(c) {
                    session.answer(option)?;
                }
            }
            KeyCode::Char('n') | KeyCode::Right | KeyCode::Enter => session.next()?,
            KeyCode::Char('p') | KeyCode::Left => session.previous()?,
            KeyCode::Char('g') => {
                let input = read_line("Go to question: ")?;
                match input.parse::<usize>() {
                    Ok(n) if n >= 1 => {
                        if let Err(e) = session.jump_to(n - 1) {
                            println!("{}", e);
                        }
                    }
                    _ => println!("Not a question number: {}", input),
                }
            }
            KeyCode::Char('s') => return Ok(true),
            KeyCode::Char('q') | KeyCode::Esc => return Ok(false),
            _ => {}
        }
    }
}

fn print_result(result: &QuizResult) {
    let grade = result.grade();
    println!();
    println!("Quiz Completed! {}", grade.message());
    println!("Grade: {}", grade);
    println!(
        "Score: {:.2} / {}  ({:.1}%)",
        result.obtained_marks, result.total_marks, result.percentage
    );
    println!(
        "Correct: {}  Wrong: {}  Skipped: {}  Attempted: {}/{}",
        result.correct, result.wrong, result.skipped, result.attempted, result.total_questions
    );
    println!("Time taken: {}", format_duration(result.time_taken_secs));
    println!();

    for (i, q) in result.questions.iter().enumerate() {
        let status = match q.outcome() {
            QuestionOutcome::Correct => "correct",
            QuestionOutcome::Wrong => "wrong",
            QuestionOutcome::Skipped => "skipped",
        };
        println!("{}. [{}] {}", i + 1, status, q.prompt);
        if let Some(answer) = q.user_answer {
            println!("   Your answer: {}. {}", answer.label(), q.option(answer));
        }
        println!("   Correct answer: {}. {}", q.correct.label(), q.option(q.correct));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let settings = QuizSettings::new(args.questions, args.marks, args.negative)?;

    let mut config = SourceConfig::from_env();
    if args.source.is_some() {
        config.source = args.source.clone();
    }
    let kind = SourceKind::detect(&config).map_err(|e| anyhow!(e))?;
    let source = kind.build(&config).context("could not set up the question source")?;
    if kind == SourceKind::Demo {
        println!("Demo mode: set QUIZ_SOURCE_URL to generate real questions.");
    }

    let mut session = QuizSession::with_settings(settings)?;
    if let Err(e) = session.upload_file(&args.file).await {
        eprintln!("{}", e.notice());
        return Err(e.into());
    }

    if let Some(syllabus) = session.syllabus() {
        println!("Loaded {}", syllabus.name);
    }
    let settings = session.settings();
    println!(
        "{} questions, +{} per correct, -{} per wrong, {} marks total",
        settings.question_count,
        settings.marks_per_question,
        settings.negative_per_wrong,
        settings.total_marks()
    );
    println!("Generating questions with the {} source...", kind);

    if let Err(e) = session.start(&source).await {
        eprintln!("{}", e.notice());
        return Err(e.into());
    }

    if !run_quiz(&mut session)? {
        println!("Quit without submitting.");
        return Ok(());
    }

    let result = session.submit()?;
    print_result(result);
    Ok(())
}
