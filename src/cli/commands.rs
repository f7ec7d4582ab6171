use std::collections::HashMap;
use std::io::Read;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::app::{AppContext, Result};
use crate::domain::{MediaKind, Post, PostId};
use crate::normalizer::{process_html_content, process_to_text};

/// Print the feed and follow it until Ctrl-C or `q`.
///
/// Typed commands on stdin: `r` reconnect, `c` connect, `d` disconnect, `q` quit.
pub async fn watch(ctx: &AppContext, no_snapshot: bool) -> Result<()> {
    let (handle, task) = if no_snapshot {
        ctx.start_feed_with(Vec::new())?
    } else {
        ctx.start_feed().await?
    };

    let mut printer = FeedPrinter::default();
    let initial = handle.posts();
    println!("Loaded {} posts", initial.len());
    printer.print_changes(&initial);

    let mut posts_rx = handle.subscribe_posts();
    let mut state_rx = handle.subscribe_state();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            changed = posts_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let posts = posts_rx.borrow_and_update().clone();
                printer.print_changes(&posts);
            }
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *state_rx.borrow_and_update();
                println!("-- {}", state);
                if state.is_retryable() {
                    println!("   (type `r` + Enter to retry)");
                }
            }
            line = stdin.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => match line.trim() {
                        "r" => handle.reconnect()?,
                        "c" => handle.connect()?,
                        "d" => handle.disconnect()?,
                        "q" => break,
                        "" => {}
                        other => eprintln!("Unknown command: {}", other),
                    },
                    _ => stdin_open = false,
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    let _ = handle.shutdown();
    let _ = task.await;
    Ok(())
}

pub async fn snapshot(ctx: &AppContext, json: bool) -> Result<()> {
    let snapshot = ctx.fetch_snapshot().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot.posts)?);
        return Ok(());
    }

    if snapshot.posts.is_empty() {
        println!("No posts");
        return Ok(());
    }

    for post in &snapshot.posts {
        println!("{}", format_post(post));
    }
    if snapshot.has_more {
        println!("... more available from offset {}", snapshot.next_offset);
    }

    Ok(())
}

pub fn render(body: Option<String>, text: bool) -> Result<()> {
    let body = match body {
        Some(body) => body,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    if text {
        println!("{}", process_to_text(&body));
    } else {
        println!(
            "{}",
            serde_json::to_string_pretty(&process_html_content(&body))?
        );
    }

    Ok(())
}

/// Prints posts it has not shown yet, and annotations as they arrive.
#[derive(Default)]
struct FeedPrinter {
    seen: HashMap<PostId, Option<String>>,
}

impl FeedPrinter {
    fn print_changes(&mut self, posts: &[Post]) {
        // oldest first so the newest post ends up at the bottom of the terminal
        for post in posts.iter().rev() {
            match self.seen.get(&post.id) {
                None => println!("{}", format_post(post)),
                Some(annotation) if *annotation != post.annotation => {
                    if let Some(text) = &post.annotation {
                        println!("  ✦ AI overview for {}: {}", post.id, text);
                    }
                }
                Some(_) => continue,
            }
            self.seen.insert(post.id.clone(), post.annotation.clone());
        }
    }
}

fn format_post(post: &Post) -> String {
    let mut out = format!(
        "[{}] {}",
        post.display_timestamp(),
        process_to_text(&post.body)
    );

    let (videos, images) = post
        .media()
        .fold((0, 0), |(v, i), (kind, _)| match kind {
            MediaKind::Video => (v + 1, i),
            MediaKind::Image => (v, i + 1),
        });
    if videos + images > 0 {
        out.push_str(&format!("\n    media: {} image(s), {} video(s)", images, videos));
    }
    if !post.source_url.is_empty() {
        out.push_str(&format!("\n    {}", post.source_url));
    }
    if let Some(annotation) = &post.annotation {
        out.push_str(&format!("\n  ✦ AI overview: {}", annotation));
    }

    out
}
