use exam_core::model::{ChoiceId, ExamProgress, QuestionId, SessionNumber};
use exam_core::stats::ProgressStats;
use services::{ProgressService, ReviewItem, SessionHistoryItem};
use tracing::debug;

use crate::cli::Command;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

pub async fn dispatch(service: &ProgressService, command: Command) -> CmdResult {
    debug!(?command, "dispatching command");
    match command {
        Command::Status => status(service).await,
        Command::Start => {
            let progress = service.start_session().await?;
            println!("Started session {}.", progress.display_session_number());
            Ok(())
        }
        Command::Resume => {
            let progress = service.resume_session().await?;
            print_active(&progress);
            Ok(())
        }
        Command::Page { page } => {
            let progress = service.update_page(page).await?;
            if progress.has_active_session() {
                println!("Saved page {page}.");
            } else {
                println!("No active session; page not saved.");
            }
            Ok(())
        }
        Command::Answer { question, choices } => {
            let question = QuestionId::new(question)?;
            let selected = choices
                .into_iter()
                .map(ChoiceId::new)
                .collect::<Result<Vec<_>, _>>()?;
            let outcome = service.answer(&question, selected).await?;
            let verdict = if outcome.result.is_correct() {
                "correct"
            } else {
                "incorrect"
            };
            println!(
                "{question}: {verdict} (session {}).",
                outcome.progress.display_session_number()
            );
            if let Some(explanation) = service.bank().question(&question).map(|q| &q.explanation) {
                println!("{explanation}");
            }
            Ok(())
        }
        Command::Flag { question, off } => {
            let question = QuestionId::new(question)?;
            service.set_review_flag(&question, !off).await?;
            let state = if off { "cleared" } else { "set" };
            println!("Review flag {state} for {question}.");
            Ok(())
        }
        Command::Complete => {
            let before = service.load().await?;
            let Some(session) = before.current_session().map(|s| s.session_number()) else {
                println!("No active session.");
                return Ok(());
            };
            service.complete_session().await?;
            println!("Completed session {session}.");
            Ok(())
        }
        Command::History => {
            print_history(&service.history().await?);
            Ok(())
        }
        Command::Forget { session } => {
            let number = SessionNumber::new(session);
            let before = service.load().await?;
            if before.archived_session(number).is_none() {
                println!("Session {number} is not in the history.");
                return Ok(());
            }
            service.remove_session(number).await?;
            println!("Removed session {number} from the history.");
            Ok(())
        }
        Command::Review => {
            print_review(&service.review_queue().await?);
            Ok(())
        }
        Command::Reset => {
            if service.reset().await? {
                println!("Progress for {} deleted.", service.bank().exam_id);
            } else {
                println!("No stored progress for {}.", service.bank().exam_id);
            }
            Ok(())
        }
    }
}

async fn status(service: &ProgressService) -> CmdResult {
    let bank = service.bank();
    println!("{} ({}, version {})", bank.title, bank.exam_id, bank.version);

    let stats = service.stats().await?;
    match stats.session {
        Some(session) => {
            let progress = service.load().await?;
            print_active(&progress);
            print_stats("  session ", &session);
        }
        None => println!("No active session."),
    }
    print_stats("  lifetime", &stats.cumulative);
    Ok(())
}

fn print_active(progress: &ExamProgress) {
    match progress.current_session() {
        Some(session) => {
            let page = progress.resume_page().unwrap_or(1);
            println!(
                "Session {} started {}, page {page}.",
                session.session_number(),
                session.started_at().format("%Y-%m-%d %H:%M")
            );
        }
        None => println!("No active session."),
    }
}

fn print_stats(label: &str, stats: &ProgressStats) {
    println!(
        "{label}: {answered} answered, {correct} correct, {incorrect} incorrect, \
         {unanswered} unanswered, {flagged} flagged, {rate:.1}% correct",
        answered = stats.answered_count,
        correct = stats.correct_count,
        incorrect = stats.incorrect_count,
        unanswered = stats.unanswered_count,
        flagged = stats.flagged_count,
        rate = stats.correct_rate,
    );
}

fn print_history(items: &[SessionHistoryItem]) {
    if items.is_empty() {
        println!("No completed sessions.");
        return;
    }
    for item in items {
        let finished = item.completed_at.map_or_else(
            || "-".to_owned(),
            |at| at.format("%Y-%m-%d %H:%M").to_string(),
        );
        print_stats(
            &format!("#{:<3} {finished}", item.session_number.value()),
            &item.stats,
        );
    }
}

fn print_review(items: &[ReviewItem]) {
    if items.is_empty() {
        println!("Nothing to review.");
        return;
    }
    for item in items {
        let marker = if item.progress.is_flagged_for_review {
            "flagged"
        } else {
            "missed"
        };
        println!(
            "{:<12} {marker:<8} {}/{} correct",
            item.question_id.as_str(),
            item.progress.total_correct,
            item.progress.total_attempts
        );
    }
}
