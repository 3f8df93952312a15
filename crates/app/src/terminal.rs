//! Line-oriented survey front end.
//!
//! Without an open section the user picks one from the list by number; inside
//! a section numbers are answers. Reader and writer are generic so the loop can
//! be driven from tests.

use std::error::Error;
use std::io::Write;

use services::{FlushResult, SurveyError, SurveyLoopService, SurveySessionService};
use survey_core::model::{AnswerStoreError, AnswerValue};
use survey_core::navigation::{Direction, NavigationError, NavigationOutcome};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Number(i64),
    Next,
    Previous,
    Save,
    List,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    if let Ok(number) = line.parse::<i64>() {
        return Input::Number(number);
    }
    match line.to_ascii_lowercase().as_str() {
        "n" | "next" => Input::Next,
        "p" | "prev" | "previous" => Input::Previous,
        "s" | "save" => Input::Save,
        "l" | "list" => Input::List,
        "h" | "help" | "?" => Input::Help,
        "q" | "quit" | "exit" => Input::Quit,
        _ => Input::Unknown(line.to_string()),
    }
}

/// Drive one survey session until `q` or end of input, then save what is left.
///
/// # Errors
///
/// Returns I/O errors from the reader or writer. Survey errors are printed and
/// the loop continues.
pub async fn run_survey<R, W>(
    survey: &SurveyLoopService,
    session: &mut SurveySessionService,
    input: R,
    out: &mut W,
) -> Result<(), Box<dyn Error>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    render_list(survey, session, out).await?;

    loop {
        write!(out, "> ")?;
        out.flush()?;
        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            break;
        };

        match parse_input(&line) {
            Input::Quit => break,
            Input::Empty => {}
            Input::Help => write_help(out)?,
            Input::Unknown(raw) => writeln!(out, "unknown command: {raw} (h for help)")?,
            Input::List => {
                session.close_section();
                render_list(survey, session, out).await?;
            }
            Input::Save => save_all(survey, session, out).await?,
            Input::Number(n) if session.active_section().is_none() => {
                open_by_index(survey, session, n, out).await?;
            }
            Input::Number(value) => answer(survey, session, value, out).await?,
            Input::Next | Input::Previous if session.active_section().is_none() => {
                writeln!(out, "pick a section first")?;
            }
            Input::Next => step(survey, session, Direction::Next, out).await?,
            Input::Previous => step(survey, session, Direction::Previous, out).await?,
        }
    }

    save_all(survey, session, out).await?;
    Ok(())
}

async fn render_list<W: Write>(
    survey: &SurveyLoopService,
    session: &SurveySessionService,
    out: &mut W,
) -> Result<(), Box<dyn Error>> {
    writeln!(out)?;
    writeln!(out, "Sections:")?;
    match survey.section_statuses(session).await {
        Ok(items) => {
            for (index, item) in items.iter().enumerate() {
                let state = if item.unsaved {
                    "unsaved".to_string()
                } else if let Some(at) = item.saved_at {
                    format!("saved {}", at.format("%Y-%m-%d %H:%M"))
                } else {
                    String::new()
                };
                writeln!(
                    out,
                    "  {:>2}. {:<32} {:>2} / {:<2} {state}",
                    index + 1,
                    item.header,
                    item.completed,
                    item.total
                )?;
            }
        }
        Err(err) => report_error(&err, out)?,
    }
    writeln!(out, "Enter a section number, or h for help.")?;
    Ok(())
}

fn render_question<W: Write>(
    session: &SurveySessionService,
    out: &mut W,
) -> Result<(), Box<dyn Error>> {
    let Some(cursor) = session.cursor() else {
        return Ok(());
    };
    let section = session.session().catalog().section(cursor.section())?;
    let question = session.current_question()?;
    let position = cursor.position();

    writeln!(out)?;
    writeln!(
        out,
        "{}: question {} / {}",
        section.header(),
        position,
        section.question_count()
    )?;
    writeln!(out, "  {}", question.prompt())?;
    for value in AnswerValue::scale() {
        let marker = if session.current_answer() == Some(value) { '*' } else { ' ' };
        writeln!(out, "   {marker}{value} = {}", value.label())?;
    }

    let mut hints = vec!["[1-5] answer"];
    if position.previous().is_some() {
        hints.push("p previous");
    }
    if position.get() == section.question_count() {
        hints.push("n finish section");
    } else {
        hints.push("n next");
    }
    hints.extend(["l list", "q quit"]);
    writeln!(out, "  {}", hints.join("  "))?;
    Ok(())
}

async fn open_by_index<W: Write>(
    survey: &SurveyLoopService,
    session: &mut SurveySessionService,
    number: i64,
    out: &mut W,
) -> Result<(), Box<dyn Error>> {
    let section = usize::try_from(number)
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| survey.catalog().sections().get(index))
        .map(|section| section.id().clone());
    let Some(section) = section else {
        writeln!(out, "no section number {number}")?;
        return Ok(());
    };

    match survey.open_section(session, &section).await {
        Ok(_) => render_question(session, out)?,
        Err(err) => report_error(&err, out)?,
    }
    Ok(())
}

async fn answer<W: Write>(
    survey: &SurveyLoopService,
    session: &mut SurveySessionService,
    value: i64,
    out: &mut W,
) -> Result<(), Box<dyn Error>> {
    match survey.submit_answer(session, value).await {
        Ok(result) => {
            writeln!(out, "  answered {} ({})", result.value, result.value.label())?;
            report_flush(result.flush.as_ref(), out)?;
        }
        Err(err) => report_error(&err, out)?,
    }
    Ok(())
}

async fn step<W: Write>(
    survey: &SurveyLoopService,
    session: &mut SurveySessionService,
    direction: Direction,
    out: &mut W,
) -> Result<(), Box<dyn Error>> {
    let step = match survey.navigate(session, direction).await {
        Ok(step) => step,
        Err(err) => {
            report_error(&err, out)?;
            return Ok(());
        }
    };
    report_flush(step.flush.as_ref(), out)?;

    match step.outcome {
        NavigationOutcome::Moved(_) => render_question(session, out)?,
        NavigationOutcome::NoPrevious => writeln!(out, "already at the first question")?,
        NavigationOutcome::SectionFinished(section) => {
            writeln!(out, "section {section} finished")?;
            session.close_section();
            render_list(survey, session, out).await?;
        }
    }
    Ok(())
}

async fn save_all<W: Write>(
    survey: &SurveyLoopService,
    session: &mut SurveySessionService,
    out: &mut W,
) -> Result<(), Box<dyn Error>> {
    let results = survey.flush_all(session).await;
    if results.is_empty() {
        writeln!(out, "nothing to save")?;
    }
    for (section, result) in &results {
        write!(out, "{section}: ")?;
        report_flush(Some(result), out)?;
    }
    Ok(())
}

fn report_flush<W: Write>(flush: Option<&FlushResult>, out: &mut W) -> std::io::Result<()> {
    match flush {
        None => Ok(()),
        Some(Ok(at)) => writeln!(out, "  saved at {}", at.format("%H:%M:%S")),
        Some(Err(err)) => writeln!(out, "  not saved: {err} (s to retry)"),
    }
}

fn report_error<W: Write>(err: &SurveyError, out: &mut W) -> std::io::Result<()> {
    match err {
        SurveyError::AnswerStore(AnswerStoreError::InvalidRange(_)) => writeln!(
            out,
            "  answers range from {} to {}",
            AnswerValue::MIN,
            AnswerValue::MAX
        ),
        SurveyError::Navigation(NavigationError::AnswerRequired { .. }) => {
            writeln!(out, "  please answer this question first")
        }
        other => writeln!(out, "  {other}"),
    }
}

fn write_help<W: Write>(out: &mut W) -> std::io::Result<()> {
    writeln!(out, "  <number>  open a section (list) or answer 1-5 (question)")?;
    writeln!(out, "  n / p     next / previous question")?;
    writeln!(out, "  s         save unsaved sections")?;
    writeln!(out, "  l         back to the section list")?;
    writeln!(out, "  q         save and quit")
}
