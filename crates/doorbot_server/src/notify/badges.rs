//! Medal and streak badges used in chat announcements.

use std::fmt::Write;

use doorbot_core::Stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Badge {
    pub threshold: u32,
    pub emoji: &'static str,
    pub label: &'static str,
}

const fn badge(threshold: u32, emoji: &'static str, label: &'static str) -> Badge {
    Badge {
        threshold,
        emoji,
        label,
    }
}

/// Ascending by threshold.
pub const TOTAL_BADGES: &[Badge] = &[
    badge(0, ":fatcat:", ""),
    badge(5, ":fatcat-yellow:", "UNO"),
    badge(29, ":fatcat-green:", "TEENSY"),
    badge(98, ":fatcat-blue:", "RPI"),
    badge(363, ":fatcat-pink:", "COMMUNITY"),
    badge(498, ":fatcat-red:", "CORE"),
    badge(998, ":fatcat-black:", "PILLAR"),
];

/// Ascending by threshold.
pub const STREAK_BADGES: &[Badge] = &[
    badge(0, ":cat2:", ""),
    badge(4, ":black_cat:", "One dedicated cat!"),
    badge(13, ":rat:", "Lab cat to lab rat!"),
    badge(30, ":tiger2:", "What the ...?"),
    badge(182, ":leopard:", "Do you sleep here?"),
    badge(365, ":house_with_garden:", "You DO live here! Welcome home."),
];

/// The badge held at `value`: the highest threshold strictly below it.
/// The flag is set when `value` is the first count at that badge.
pub fn lookup(table: &[Badge], value: u32) -> Option<(Badge, bool)> {
    table
        .iter()
        .rev()
        .find(|b| value > b.threshold)
        .map(|b| (*b, value == b.threshold + 1))
}

/// Chat message announcing a member's visit.
pub fn announcement(stats: &Stats) -> String {
    let total = lookup(TOTAL_BADGES, stats.total);
    let streak = lookup(STREAK_BADGES, stats.streak);

    let mut msg = format!(
        "{} {} {} {} {}",
        stats.name,
        total.map_or("", |(b, _)| b.emoji),
        stats.total,
        streak.map_or("", |(b, _)| b.emoji),
        stats.streak,
    );

    if let Some((b, true)) = total {
        if stats.total > 1 {
            let _ = write!(
                msg,
                "\n:tada: Achievement unlocked! You get the {} medal: {}",
                b.label, b.emoji
            );
        }
    }

    if let Some((b, true)) = streak {
        if stats.streak > 1 {
            let _ = write!(msg, "\n{}", b.label);
        }
    }

    msg
}
