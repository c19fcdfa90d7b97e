// Colored terminal output for feeds, live events and comments.
//
// The CLI's display functions delegate here; nothing in the core prints.

use chrono::Utc;
use colored::Colorize;

use super::{format_count, relative_time, truncate_chars};
use crate::engagement::Outcome;
use crate::feed::aggregator::FeedStatus;
use crate::feed::events::{FeedEvent, RemoteEvent};
use crate::feed::models::{Comment, FeedItem, Level};
use crate::session::Session;

const CAPTION_PREVIEW: usize = 140;

/// Display a full feed, newest first.
pub fn display_feed(level: &Level, items: &[FeedItem], status: &FeedStatus, viewer: &Session) {
    println!(
        "\n{}",
        format!("=== {} ({} items) ===", level, items.len()).bold()
    );

    match status {
        FeedStatus::Unavailable => {
            println!("  {} Feed could not be loaded.", "!!".red().bold());
            return;
        }
        FeedStatus::Degraded { failed } => {
            let names: Vec<String> = failed.iter().map(|s| s.to_string()).collect();
            println!(
                "  {} Some sources failed: {}",
                "!".yellow(),
                names.join(", ")
            );
        }
        FeedStatus::Idle | FeedStatus::Ready => {}
    }

    if items.is_empty() {
        println!("  No posts for this level yet");
        return;
    }

    for item in items {
        display_item(item, viewer);
    }
    println!();
}

/// Display one feed card.
pub fn display_item(item: &FeedItem, viewer: &Session) {
    let body = item.body();
    let author = &body.author;
    let when = relative_time(body.created_at, Utc::now());

    println!();
    if let Some(mark) = &body.bumped_by {
        println!("  {} recast by @{}", "⟳".green(), mark.user_name);
    }
    println!(
        "  {} {} {}  {}",
        author.display_name.bold(),
        format!("@{}", author.handle).dimmed(),
        format!("[{}]", item.kind_name()).cyan(),
        when.dimmed().italic(),
    );

    match item {
        FeedItem::Post(_) => {
            print_caption(&body.caption, &body.media);
        }
        FeedItem::Recite(recite) => {
            if !recite.quote.is_empty() {
                println!("  {}", truncate_chars(&recite.quote, CAPTION_PREVIEW));
            }
            println!(
                "  {} {}",
                "│".dimmed(),
                format!("@{}", recite.original.author.handle).dimmed()
            );
            print_quoted(&recite.original.caption, &recite.original.media);
        }
        FeedItem::Recast(recast) => {
            println!(
                "  {}",
                format!("reposted from @{}", recast.original.author.handle).dimmed()
            );
            print_caption(&recast.original.caption, &recast.original.media);
        }
    }

    let engagement = &body.engagement;
    let heart = if viewer.is_signed_in() && engagement.is_liked_by(&viewer.user_id) {
        "♥".red().to_string()
    } else {
        "♡".normal().to_string()
    };
    println!(
        "  💬 {:<6} ⟳ {:<6} ❝ {:<6} {} {:<6} 👁 {:<6} {}",
        format_count(engagement.comments_count),
        format_count(engagement.recast_count),
        format_count(engagement.recite_count),
        heart,
        format_count(engagement.like_count() as u64),
        format_count(engagement.views),
        body.id.dimmed(),
    );
}

fn print_caption(caption: &str, media: &[String]) {
    if !caption.is_empty() {
        println!("  {}", truncate_chars(caption, CAPTION_PREVIEW));
    }
    print_media(media, "  ");
}

fn print_quoted(caption: &str, media: &[String]) {
    if !caption.is_empty() {
        println!(
            "  {} {}",
            "│".dimmed(),
            truncate_chars(caption, CAPTION_PREVIEW).dimmed()
        );
    }
    print_media(media, "  │ ");
}

fn print_media(media: &[String], indent: &str) {
    // Cards show at most four tiles, the last one with a "+N" overlay.
    for uri in media.iter().take(4) {
        println!("{indent}{} {}", "▣".blue(), uri.dimmed());
    }
    if media.len() > 4 {
        println!("{indent}  +{}", media.len() - 4);
    }
}

/// One-line summary of an applied event, for `watch`.
pub fn display_event(event: &FeedEvent, feed_len: usize) {
    let line = match event {
        FeedEvent::Remote(RemoteEvent::NewPost(post)) => {
            format!("{} new post {} by @{}", "+".green(), post.body.id, post.body.author.handle)
        }
        FeedEvent::Remote(RemoteEvent::NewRecite(recite)) => format!(
            "{} new recite {} by @{}",
            "+".green(),
            recite.body.id,
            recite.body.author.handle
        ),
        FeedEvent::Remote(RemoteEvent::NewRecast(recast)) => format!(
            "{} recast of {} by @{}",
            "⟳".green(),
            recast.original_post_id,
            recast.body.author.handle
        ),
        FeedEvent::Remote(RemoteEvent::DeletePost(id)) | FeedEvent::ItemRemoved(id) => {
            format!("{} deleted {}", "-".red(), id)
        }
        FeedEvent::ItemUpdated(item) => format!("{} updated {}", "~".yellow(), item.id()),
    };
    println!("  {line}  {}", format!("({feed_len} items)").dimmed());
}

pub fn display_comments(item_id: &str, comments: &[Comment]) {
    println!(
        "\n{}",
        format!("=== Comments on {} ({}) ===", item_id, comments.len()).bold()
    );
    if comments.is_empty() {
        println!("  No comments yet");
        return;
    }
    let now = Utc::now();
    for comment in comments {
        let when = comment
            .created_at
            .map(|at| relative_time(at, now))
            .unwrap_or_default();
        println!(
            "  {} {}  {}",
            comment.user_name.bold(),
            when.dimmed(),
            truncate_chars(&comment.text, CAPTION_PREVIEW)
        );
        if let Some(image) = &comment.image {
            println!("    {} {}", "▣".blue(), image.dimmed());
        }
    }
}

/// Report how an engagement action ended.
pub fn display_outcome(action: &str, outcome: Outcome) {
    match outcome {
        Outcome::Committed => println!("{} {}", "✓".green(), action),
        Outcome::Skipped => println!("{} {} skipped", "-".dimmed(), action),
        Outcome::RolledBack => println!(
            "{} {} failed, local change rolled back",
            "✗".red(),
            action
        ),
        Outcome::Failed => println!("{} {} failed", "✗".red(), action),
    }
}

pub fn display_session(session: &Session) {
    if !session.is_signed_in() {
        println!("Not signed in. Set CAST_USER_ID in your .env file.");
        return;
    }
    println!("User id: {}", session.user_id);
    if !session.display_name.is_empty() {
        println!("Name:    {}", session.display_name);
    }
    println!("Handle:  @{}", session.handle);
    if let Some(avatar) = &session.avatar {
        println!("Avatar:  {}", avatar.dimmed());
    }
}
