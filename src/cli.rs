//! Command-line interface - argument parsing and the interactive loop.
//!
//! The CLI wires the collaborators together in the order the data flows:
//! image files through OCR, optional translation, the line parser, and then
//! an interactive prompt for editing assignments and prices before the
//! balances are printed or exported.

use crate::config::{AppConfig, Prefs};
use crate::core::balance::{compute_balances, format_net, settlement_line};
use crate::core::parser::{ParseOptions, parse_lines};
use crate::core::session::SplitSession;
use crate::errors::{Error, Result};
use crate::export::{export_pdf, lines_as_text};
use crate::models::{ReceiptLine, Roommate};
use crate::ocr::{ProgressFn, TesseractOcr, process_files};
use crate::translate::Translator;
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

/// Split grocery receipts between roommates.
#[derive(Parser, Debug)]
#[command(name = "receipt-splitter", version, about = "Split grocery receipt costs between roommates")]
pub struct Cli {
    /// Receipt images to recognize (processed one at a time, in order)
    pub files: Vec<PathBuf>,

    /// Roommate name sharing the costs; repeat for each person (at least
    /// two roommates always exist, defaults fill in the gaps)
    #[arg(short = 'r', long = "roommate")]
    pub roommates: Vec<String>,

    /// Name of the roommate who paid the receipts (defaults to the first)
    #[arg(long)]
    pub payer: Option<String>,

    /// Machine-translate recognized lines before parsing
    #[arg(long)]
    pub translate: bool,

    /// Parse the translated text instead of the original
    #[arg(long)]
    pub show_translated: bool,

    /// Write a PDF summary to this path
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Receipt title used in the PDF summary
    #[arg(long, default_value = "Receipt")]
    pub title: String,

    /// Path to a settings file (default ./config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Skip the interactive prompt and just print the summary
    #[arg(long)]
    pub non_interactive: bool,
}

/// Runs the full pipeline for the parsed arguments.
pub async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load_default()?,
    };
    let mut prefs = Prefs::load();

    let mut session = build_session(&cli.roommates);
    if let Some(payer) = &cli.payer {
        let id = session
            .roommate_by_name(payer)
            .map(|r| r.id)
            .ok_or_else(|| Error::RoommateNotFound {
                name: payer.clone(),
            })?;
        session.set_payer(id);
    }

    let mut lines = recognize(&cli.files, &config).await;
    if cli.translate && !lines.is_empty() {
        let translator = match &config.translation_endpoint {
            Some(endpoint) => Translator::with_endpoint(endpoint, &config.translation_langpair),
            None => Translator::new(&config.translation_langpair),
        };
        translator.translate_lines(&mut lines).await;
    }

    let outcome = parse_lines(
        &lines,
        ParseOptions {
            show_translated: cli.show_translated,
        },
    );
    session.absorb(outcome);

    print_items(&session, &config.currency);
    print_warnings(&session, &config.currency);

    if cli.non_interactive {
        print_balances(&session, &config.currency);
    } else {
        run_prompt(&mut session, &mut prefs, &lines, &config.currency).await?;
    }

    if let Some(path) = &cli.export {
        write_export(path, &session, &cli.title, &config.currency)?;
    }

    Ok(())
}

/// Builds the session from the given names, filling in defaults so the
/// floor-of-two invariant holds, and adding any extras beyond the first two.
fn build_session(names: &[String]) -> SplitSession {
    let first = names.first().map_or("", String::as_str);
    let second = names.get(1).map_or("", String::as_str);
    let mut session = SplitSession::new(first, second);
    for name in names.iter().skip(2) {
        session.add_roommate(name);
    }
    session
}

async fn recognize(files: &[PathBuf], config: &AppConfig) -> Vec<ReceiptLine> {
    if files.is_empty() {
        return Vec::new();
    }
    let engine = TesseractOcr::new(&config.ocr_languages, config.confidence_threshold);
    let progress = |percent: u8| info!(percent, "OCR progress");
    let lines = process_files(&engine, files, Some(&progress as &ProgressFn)).await;
    info!(lines = lines.len(), files = files.len(), "recognition finished");
    lines
}

fn write_export(path: &Path, session: &SplitSession, title: &str, currency: &str) -> Result<()> {
    let sheet = compute_balances(session);
    export_pdf(path, session, &sheet, title, currency)?;
    println!("Wrote summary to {}", path.display());
    Ok(())
}

/// The interactive prompt. Every command maps onto one session operation;
/// rejected edits leave the session untouched and just say so.
async fn run_prompt(
    session: &mut SplitSession,
    prefs: &mut Prefs,
    lines: &[ReceiptLine],
    currency: &str,
) -> Result<()> {
    println!("Type 'help' for commands, 'quit' to finish.");
    let mut reader = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(input) = reader.next_line().await? else {
            break;
        };
        if !handle_command(session, prefs, lines, currency, input.trim())? {
            break;
        }
    }

    print_balances(session, currency);
    Ok(())
}

/// Dispatches one prompt line. Returns `false` when the loop should end.
fn handle_command(
    session: &mut SplitSession,
    prefs: &mut Prefs,
    lines: &[ReceiptLine],
    currency: &str,
    input: &str,
) -> Result<bool> {
    let (command, rest) = match input.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (input, ""),
    };

    match command {
        "" => {}
        "help" => print_help(),
        "lines" => println!("{}", lines_as_text(lines)),
        "items" => print_items(session, currency),
        "roommates" => print_roommates(session, prefs),
        "balances" => print_balances(session, currency),
        "warnings" => print_warnings(session, currency),
        "add-roommate" => {
            if session.add_roommate(rest).is_none() {
                println!("Roommate name cannot be empty.");
            }
        }
        "remove-roommate" => match session.roommate_by_name(rest).map(|r| r.id) {
            Some(id) if session.remove_roommate(id) => {}
            Some(_) => println!("At least two roommates must remain."),
            None => println!("No roommate named '{rest}'."),
        },
        "rename-roommate" => {
            let Some((old, new)) = rest.split_once(char::is_whitespace) else {
                println!("Usage: rename-roommate OLD NEW");
                return Ok(true);
            };
            match session.roommate_by_name(old).map(|r| r.id) {
                Some(id) if session.rename_roommate(id, new.trim()) => {}
                Some(_) => println!("New name cannot be empty."),
                None => println!("No roommate named '{old}'."),
            }
        }
        "payer" => match session.roommate_by_name(rest).map(|r| r.id) {
            Some(id) => {
                session.set_payer(id);
            }
            None => println!("No roommate named '{rest}'."),
        },
        "assign" => {
            let Some((index, name)) = rest.split_once(char::is_whitespace) else {
                println!("Usage: assign ITEM ROOMMATE");
                return Ok(true);
            };
            match (item_id_by_number(session, index), session.roommate_by_name(name.trim()).map(|r| r.id)) {
                (Some(item_id), Some(roommate_id)) => {
                    session.toggle_assignment(&item_id, roommate_id);
                }
                (None, _) => println!("No item #{index}."),
                (_, None) => println!("No roommate named '{}'.", name.trim()),
            }
        }
        "assign-all" => match item_id_by_number(session, rest) {
            Some(item_id) => {
                session.toggle_all_assignments(&item_id);
            }
            None => println!("No item #{rest}."),
        },
        "price" => {
            let Some((index, value)) = rest.split_once(char::is_whitespace) else {
                println!("Usage: price ITEM VALUE");
                return Ok(true);
            };
            let parsed = value.trim().replace(',', ".").parse::<f64>().ok();
            match (item_id_by_number(session, index), parsed) {
                (Some(item_id), Some(price)) if session.set_item_price(&item_id, price) => {}
                (Some(_), _) => println!("'{}' is not a valid price.", value.trim()),
                (None, _) => println!("No item #{index}."),
            }
        }
        "add-item" => {
            let Some((name, price)) = rest.rsplit_once(char::is_whitespace) else {
                println!("Usage: add-item NAME PRICE");
                return Ok(true);
            };
            let parsed = price.trim().replace(',', ".").parse::<f64>().ok();
            match parsed {
                Some(price) if session.add_manual_item(name, price).is_some() => {}
                _ => println!("Usage: add-item NAME PRICE"),
            }
        }
        "hide" => session.hide_file(rest),
        "unhide" => session.unhide_file(rest),
        "theme" => {
            let dark = prefs.toggle_dark_mode()?;
            println!("Theme: {}", if dark { "dark" } else { "light" });
        }
        "quit" | "exit" => return Ok(false),
        other => println!("Unknown command '{other}'. Type 'help' for commands."),
    }

    Ok(true)
}

fn item_id_by_number(session: &SplitSession, token: &str) -> Option<String> {
    let number: usize = token.trim().parse().ok()?;
    session
        .items()
        .get(number.checked_sub(1)?)
        .map(|item| item.id.clone())
}

fn print_help() {
    println!(
        "Commands:\n  \
         lines                      show recognized receipt lines\n  \
         items                      list items with prices and assignees\n  \
         roommates                  list roommates (payer marked with *)\n  \
         balances                   show paid/share/net per roommate\n  \
         warnings                   show reconciliation advisories\n  \
         add-roommate NAME          add a roommate\n  \
         remove-roommate NAME       remove a roommate (two must remain)\n  \
         rename-roommate OLD NEW    rename a roommate\n  \
         payer NAME                 designate who paid\n  \
         assign ITEM ROOMMATE       toggle a roommate on an item\n  \
         assign-all ITEM            toggle everyone on an item\n  \
         price ITEM VALUE           change an item's price\n  \
         add-item NAME PRICE        add an item by hand\n  \
         hide FILE / unhide FILE    exclude a receipt from balances\n  \
         theme                      toggle dark mode\n  \
         quit                       finish and print balances"
    );
}

fn print_items(session: &SplitSession, currency: &str) {
    if session.items().is_empty() {
        println!("No items.");
        return;
    }
    println!("Items:");
    for (index, item) in session.items().iter().enumerate() {
        let assignees: Vec<&str> = session
            .roommates()
            .iter()
            .filter(|r| item.assigned_to.contains(&r.id))
            .map(|r| r.name.as_str())
            .collect();
        let hidden = if session.hidden_files().contains(&item.source_file) {
            " [hidden]"
        } else {
            ""
        };
        println!(
            "  {:>3}. {} {} {:.2} -> {}{hidden}",
            index + 1,
            item.name,
            currency,
            item.current_price,
            if assignees.is_empty() {
                "nobody".to_string()
            } else {
                assignees.join(", ")
            },
        );
    }
}

fn print_roommates(session: &SplitSession, prefs: &Prefs) {
    println!("Roommates:");
    for roommate in session.roommates() {
        let marker = if roommate.id == session.who_paid() {
            "*"
        } else {
            " "
        };
        println!(
            "  {marker} {} ({})",
            roommate.name,
            display_color(roommate, prefs)
        );
    }
}

fn display_color<'a>(roommate: &'a Roommate, prefs: &Prefs) -> &'a str {
    if prefs.dark_mode {
        &roommate.color.dark
    } else {
        &roommate.color.light
    }
}

fn print_warnings(session: &SplitSession, currency: &str) {
    if let Some(warning) = session.reconciliation_warnings(currency) {
        println!("Warning: {warning}");
    }
}

fn print_balances(session: &SplitSession, currency: &str) {
    let sheet = compute_balances(session);
    println!("Balances:");
    for roommate in session.roommates() {
        let Some(balance) = sheet.balance_for(roommate.id) else {
            continue;
        };
        println!(
            "  {}: paid {currency} {:.2}, share {currency} {:.2}, net {}",
            roommate.name,
            balance.paid,
            balance.share,
            format_net(balance.net(), currency),
        );
    }
    for roommate in session.roommates() {
        if let Some(balance) = sheet.balance_for(roommate.id) {
            println!("  {}", settlement_line(roommate, balance, session, currency));
        }
    }
    println!(
        "  Combined receipts: {currency} {:.2}",
        sheet.total_visible
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::parsed_outcome;

    fn prefs() -> Prefs {
        Prefs::default()
    }

    #[test]
    fn test_build_session_defaults_and_extras() {
        let session = build_session(&[]);
        assert_eq!(session.roommates().len(), 2);

        let names = vec!["Alice".to_string(), "Bob".to_string(), "Carol".to_string()];
        let session = build_session(&names);
        assert_eq!(session.roommates().len(), 3);
        assert_eq!(session.roommates()[2].name, "Carol");
    }

    #[test]
    fn test_handle_command_price_edit() {
        let mut session = build_session(&[]);
        session.absorb(parsed_outcome(&[("a.jpg:0", "Brot", 2.20)], &[]));

        let mut p = prefs();
        handle_command(&mut session, &mut p, &[], "CHF", "price 1 3.00").expect("command runs");
        assert!((session.items()[0].current_price - 3.00).abs() < 1e-9);

        // Invalid price leaves prior state untouched.
        handle_command(&mut session, &mut p, &[], "CHF", "price 1 abc").expect("command runs");
        assert!((session.items()[0].current_price - 3.00).abs() < 1e-9);
    }

    #[test]
    fn test_handle_command_assign_toggles() {
        let mut session = build_session(&[]);
        session.absorb(parsed_outcome(&[("a.jpg:0", "Brot", 2.20)], &[]));
        let alice = session.roommates()[0].name.clone();

        let mut p = prefs();
        handle_command(&mut session, &mut p, &[], "CHF", &format!("assign 1 {alice}"))
            .expect("command runs");
        let alice_id = session.roommates()[0].id;
        assert!(!session.items()[0].assigned_to.contains(&alice_id));
    }

    #[test]
    fn test_handle_command_add_item_with_spaces_in_name() {
        let mut session = build_session(&[]);
        let mut p = prefs();
        handle_command(&mut session, &mut p, &[], "CHF", "add-item Mais Chips 1.95")
            .expect("command runs");

        assert_eq!(session.items().len(), 1);
        assert_eq!(session.items()[0].name, "Mais Chips");
        assert!((session.items()[0].current_price - 1.95).abs() < 1e-9);
    }

    #[test]
    fn test_handle_command_quit() {
        let mut session = build_session(&[]);
        let mut p = prefs();
        let keep_going =
            handle_command(&mut session, &mut p, &[], "CHF", "quit").expect("command runs");
        assert!(!keep_going);
    }

    #[test]
    fn test_handle_command_remove_roommate_at_floor() {
        let mut session = build_session(&[]);
        let name = session.roommates()[0].name.clone();
        let mut p = prefs();
        handle_command(&mut session, &mut p, &[], "CHF", &format!("remove-roommate {name}"))
            .expect("command runs");
        assert_eq!(session.roommates().len(), 2);
    }

    #[test]
    fn test_handle_command_hide_and_unhide() {
        let mut session = build_session(&[]);
        session.absorb(parsed_outcome(&[("a.jpg:0", "Brot", 2.20)], &[]));
        let mut p = prefs();

        handle_command(&mut session, &mut p, &[], "CHF", "hide a.jpg").expect("command runs");
        assert_eq!(session.visible_items().count(), 0);
        handle_command(&mut session, &mut p, &[], "CHF", "unhide a.jpg").expect("command runs");
        assert_eq!(session.visible_items().count(), 1);
    }
}
