use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use super::{Cli, Commands, PeriodArg, RoleArg, SortBy};
use crate::aggregate::{TextAggregator, activity_by_period, stopword_set, word_frequencies};
use crate::config::Config;
use crate::filters::{apply_filters, parse_filter};
use crate::loader::{LoadPolicy, LoadReport, find_latest_export, load_export_file};
use crate::models::{
    BranchScope, CollectionSummary, ConversationCollection, ConversationStats, SortKey,
};
use crate::render::{OutputMode, write_markdown_files, write_word_frequencies};
use crate::utils::terminal::{clean_for_terminal, truncate_for_display};
use crate::utils::{default_export_search_dir, default_output_dir, format_path_with_tilde};

const TITLE_WIDTH: usize = 60;

pub fn execute(cli: &Cli, config: &Config) -> Result<()> {
    let export_path = resolve_export_path(cli.export.as_deref(), config)?;
    let policy = if cli.strict { LoadPolicy::Strict } else { LoadPolicy::SkipInvalid };
    let report = load_export_file(&export_path, policy)?;
    report_skipped(&report);

    let collection = match &cli.filter {
        Some(expr) => apply_filters(&report.collection, &parse_filter(expr)?),
        None => report.collection.clone(),
    };

    match &cli.command {
        Commands::Stats { json } => show_stats(&collection, &export_path, &report, *json),
        Commands::Top { by, count } => show_top(&collection, *by, *count),
        Commands::Markdown { out, clear, no_yaml } => {
            export_markdown(&collection, config, out.as_deref(), *clear, *no_yaml)
        }
        Commands::Timeline { period, messages, role } => {
            show_timeline(&collection, *period, *messages, *role)
        }
        Commands::Words { role, all_branches, count, min_len, out } => show_words(
            &collection,
            config,
            WordsArgs {
                role: *role,
                all_branches: *all_branches,
                count: *count,
                min_len: *min_len,
                out: out.as_deref(),
            },
        ),
    }
}

/// `--export`, then the configured path, then the newest export on disk
fn resolve_export_path(explicit: Option<&Path>, config: &Config) -> Result<PathBuf> {
    if let Some(path) = explicit.or(config.export_path.as_deref()) {
        return Ok(path.to_path_buf());
    }
    let search_dir = match &config.export_search_dir {
        Some(dir) => dir.clone(),
        None => default_export_search_dir()?,
    };
    find_latest_export(&search_dir).context("No export given; pass --export or set export_path")
}

fn report_skipped(report: &LoadReport) {
    if report.skipped.is_empty() {
        return;
    }
    eprintln!("Warning: skipped {} invalid conversation(s)", report.skipped.len());
    for skipped in &report.skipped {
        eprintln!("  {}: {}", clean_for_terminal(&skipped.id), clean_for_terminal(&skipped.reason));
    }
}

#[derive(Serialize)]
struct StatsReport<'a> {
    summary: Option<&'a CollectionSummary>,
    skipped: usize,
    conversations: &'a [ConversationStats],
}

fn show_stats(
    collection: &ConversationCollection,
    export_path: &Path,
    report: &LoadReport,
    json: bool,
) -> Result<()> {
    let stats = collection.stats();
    // An empty collection has no summary; that is not an error for a report
    let summary = collection.summary().ok();

    if json {
        let out = StatsReport {
            summary: summary.as_ref(),
            skipped: report.skipped.len(),
            conversations: &stats,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Conversation Export Statistics");
    println!("==============================");
    println!("Export: {}", format_path_with_tilde(export_path));
    println!("Conversations: {}", collection.len());
    println!("Skipped: {}", report.skipped.len());

    let Some(summary) = summary else {
        println!("No conversations to summarize");
        return Ok(());
    };

    println!("Messages: {} ({} from the user)", summary.total_messages, summary.total_user_messages);
    println!("Mean messages per conversation: {:.1}", summary.mean_messages);
    println!("Mean leaves per conversation: {:.2}", summary.mean_leaves);
    println!("Conversations with regenerated replies: {}", summary.branching_conversations);
    if let (Some(earliest), Some(latest)) = (summary.earliest, summary.latest) {
        println!("Span: {} to {}", earliest.format("%Y-%m-%d"), latest.format("%Y-%m-%d"));
    }
    if summary.missing_timestamp > 0 {
        println!("Without timestamp: {}", summary.missing_timestamp);
    }

    if !summary.plugin_usage.is_empty() {
        println!();
        println!("Plugins:");
        for (plugin, count) in &summary.plugin_usage {
            println!("  {}: {}", clean_for_terminal(plugin), count);
        }
    }
    println!();
    println!("Content types:");
    for (content_type, count) in &summary.content_type_usage {
        println!("  {}: {}", clean_for_terminal(content_type), count);
    }

    Ok(())
}

fn show_top(collection: &ConversationCollection, by: SortBy, count: usize) -> Result<()> {
    let key = SortKey::from(by);
    for (rank, tree) in collection.top_n(|t| key.key(t), count).iter().enumerate() {
        let value = match key {
            SortKey::CreateTime => tree.create_time().map(|t| t.to_rfc3339()),
            SortKey::UpdateTime => tree.update_time().map(|t| t.to_rfc3339()),
            _ => Some(key.key(tree).to_string()),
        };
        println!(
            "{:>3}. {:<width$}  {}  {}",
            rank + 1,
            truncate_for_display(&clean_for_terminal(tree.title()), TITLE_WIDTH),
            value.as_deref().unwrap_or("-"),
            tree.id(),
            width = TITLE_WIDTH
        );
    }
    Ok(())
}

fn export_markdown(
    collection: &ConversationCollection,
    config: &Config,
    out: Option<&Path>,
    clear: bool,
    no_yaml: bool,
) -> Result<()> {
    let out_dir = match out.or(config.output_dir.as_deref()) {
        Some(dir) => dir.to_path_buf(),
        None => default_output_dir()?,
    };
    let mut options = config.markdown_options();
    if no_yaml {
        options.yaml_header = false;
    }
    let mode = if clear { OutputMode::Clear } else { OutputMode::Keep };

    let written = write_markdown_files(collection, &out_dir, &options, mode)?;
    println!("Wrote {} markdown file(s) to {}", written.len(), format_path_with_tilde(&out_dir));
    Ok(())
}

fn show_timeline(
    collection: &ConversationCollection,
    period: PeriodArg,
    messages: bool,
    role: Option<RoleArg>,
) -> Result<()> {
    let date_format = match period {
        PeriodArg::Week => "%Y-%m-%d",
        PeriodArg::Month => "%Y-%m",
    };

    if messages {
        let activity =
            activity_by_period(collection, period.into(), role.map(Into::into), BranchScope::MainBranch);
        for (start, count) in activity {
            println!("{}\t{}", start.format(date_format), count);
        }
        return Ok(());
    }

    let grouping = match period {
        PeriodArg::Week => collection.grouped_by_week(),
        PeriodArg::Month => collection.grouped_by_month(),
    };
    for (start, group) in grouping.iter() {
        println!("{}\t{}", start.format(date_format), group.len());
    }
    if grouping.excluded_count() > 0 {
        eprintln!(
            "Warning: {} conversation(s) without a usable creation time were left out",
            grouping.excluded_count()
        );
    }
    Ok(())
}

struct WordsArgs<'a> {
    role: Option<RoleArg>,
    all_branches: bool,
    count: usize,
    min_len: usize,
    out: Option<&'a Path>,
}

fn show_words(collection: &ConversationCollection, config: &Config, args: WordsArgs) -> Result<()> {
    let scope = if args.all_branches { BranchScope::AllBranches } else { BranchScope::MainBranch };
    let mut aggregator = TextAggregator::new().with_scope(scope);
    if let Some(role) = args.role {
        aggregator = aggregator.with_role(role.into());
    }

    let text = aggregator.aggregate_text(collection);
    let stopwords = stopword_set(&config.stopwords);
    let frequencies = word_frequencies(&text, &stopwords, args.min_len);

    for (word, count) in frequencies.iter().take(args.count) {
        println!("{}\t{}", clean_for_terminal(word), count);
    }

    if let Some(path) = args.out {
        write_word_frequencies(path, &frequencies)?;
        eprintln!("Wrote {} word(s) to {}", frequencies.len(), format_path_with_tilde(path));
    }
    Ok(())
}
