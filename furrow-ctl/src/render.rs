use std::fmt::Write;

use furrow_client::{
    api::{Comment, UserId},
    prelude::*,
    Node,
};

const INDENT: &str = "  ";

fn header(c: &Comment, viewer: Option<&UserId>) -> String {
    let state = c.node_state(viewer);
    let mut res = format!(
        "#{} {} at {}",
        c.id,
        match c.author_name.is_empty() {
            true => c.author_id.as_str(),
            false => c.author_name.as_str(),
        },
        c.created_at.format("%Y-%m-%d %H:%M"),
    );
    match state.like_count {
        0 => (),
        1 => res.push_str(" | 1 like"),
        n => write!(res, " | {n} likes").unwrap(),
    }
    if state.liked_by_viewer {
        res.push_str(" (liked)");
    }
    if c.is_pending() {
        res.push_str(" [sending]");
    }
    res
}

/// Renders `forest` as indented text, with replies deeper than `max_indent`
/// displayed at that indentation
pub fn render(forest: &[Node], viewer: Option<&UserId>, max_indent: usize) -> String {
    let mut res = String::new();
    let mut stack = forest.iter().rev().collect::<Vec<_>>();
    while let Some(n) = stack.pop() {
        let pad = INDENT.repeat(n.depth.min(max_indent));
        writeln!(res, "{pad}{}", header(&n.comment, viewer)).unwrap();
        for line in n.comment.text.lines() {
            writeln!(res, "{pad}{INDENT}{line}").unwrap();
        }
        stack.extend(n.children.iter().rev());
    }
    res
}
