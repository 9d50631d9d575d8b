//! `doorbot admin` subcommands. Each returns the text to print on stdout.

use anyhow::Context;

use doorbot_core::StatsService;

use crate::config::AdminCommand;
use crate::notify::doord::csv_line;

pub async fn run(service: &dyn StatsService, command: AdminCommand) -> anyhow::Result<String> {
    match command {
        AdminCommand::Dump(member) => {
            let calendar = service.calendar();
            let history = service
                .list_history(&member.name)
                .await
                .with_context(|| format!("dumping history for {}", member.name))?;
            Ok(history
                .iter()
                .map(|r| csv_line(calendar, r.timestamp, &r.person, r.granted))
                .collect::<Vec<_>>()
                .join("\n"))
        }
        AdminCommand::Recompute(member) => {
            let stats = service
                .recompute(&member.name)
                .await
                .with_context(|| format!("recomputing stats for {}", member.name))?;
            Ok(serde_json::to_string_pretty(&stats)?)
        }
        AdminCommand::Stats(member) => {
            let stats = service
                .get(&member.name)
                .await
                .with_context(|| format!("reading stats for {}", member.name))?;
            Ok(serde_json::to_string_pretty(&stats)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use doorbot_core::{AccessEvent, Calendar, MemoryStore, Stats, StatsServiceImpl};

    use super::*;
    use crate::config::MemberArg;

    fn member() -> MemberArg {
        MemberArg {
            name: "Johnny Melavo".into(),
        }
    }

    async fn seeded() -> StatsServiceImpl<MemoryStore> {
        let svc = StatsServiceImpl::new(MemoryStore::new(), Calendar::default());
        for (day, granted) in [(20, true), (21, false), (21, true)] {
            let at = Utc.with_ymd_and_hms(2025, 1, day, 14, 0, 0).unwrap();
            let at = if granted { at } else { at - chrono::Duration::hours(1) };
            svc.add_record(&AccessEvent::new(at, "Johnny Melavo", granted))
                .await
                .unwrap();
        }
        svc
    }

    #[tokio::test]
    async fn dump_prints_local_csv() {
        let svc = seeded().await;
        let out = run(&svc, AdminCommand::Dump(member())).await.unwrap();
        assert_eq!(
            out,
            "01/20/2025,09:00:00,Johnny Melavo,1\n\
             01/21/2025,08:00:00,Johnny Melavo,0\n\
             01/21/2025,09:00:00,Johnny Melavo,1"
        );
    }

    #[tokio::test]
    async fn stats_and_recompute_print_json() {
        let svc = seeded().await;

        let shown: Stats =
            serde_json::from_str(&run(&svc, AdminCommand::Stats(member())).await.unwrap())
                .unwrap();
        assert_eq!((shown.total, shown.streak), (2, 2));

        let rebuilt: Stats =
            serde_json::from_str(&run(&svc, AdminCommand::Recompute(member())).await.unwrap())
                .unwrap();
        assert_eq!(rebuilt, shown);
    }

    #[tokio::test]
    async fn unknown_member_dumps_nothing() {
        let svc = StatsServiceImpl::new(MemoryStore::new(), Calendar::default());
        let out = run(
            &svc,
            AdminCommand::Dump(MemberArg {
                name: "Nobody".into(),
            }),
        )
        .await
        .unwrap();
        assert!(out.is_empty());
    }
}
