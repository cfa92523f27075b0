//! # Integration Tests for Blue
//!
//! End-to-end runs of the command table against an in-memory player, plus a
//! few runs of the real binary for argument handling and exit codes.

mod common;

use blue::dispatch::Outcome;
use common::{
    albums_xml, context, library, playlist_xml, run, status_xml, CannedRecommender, FakeTransport, ScriptedPicker,
};
use tempfile::TempDir;

fn player_with_status(song: u32, artist: &str, album: &str, volume: u8) -> FakeTransport {
    let transport = FakeTransport::new();
    transport.route("Status", &[], &status_xml(song, artist, album, volume));
    transport
}

#[cfg(test)]
mod control_tests {
    use super::*;

    #[test]
    fn test_volume_ramps_in_order() {
        let dir = TempDir::new().unwrap();
        let transport = player_with_status(0, "", "", 20);
        let ctx = context(&dir, &transport, &ScriptedPicker::default(), None);

        assert!(run(&ctx, &["vol", "30"]).is_success());

        let levels: Vec<String> = transport
            .posts()
            .iter()
            .filter(|c| c.path == "Volume")
            .filter_map(|c| c.param("level").map(str::to_string))
            .collect();
        assert_eq!(levels, vec!["22", "24", "26", "28", "30"]);
    }

    #[test]
    fn test_small_relative_volume_change_is_one_step() {
        let dir = TempDir::new().unwrap();
        let transport = player_with_status(0, "", "", 20);
        let ctx = context(&dir, &transport, &ScriptedPicker::default(), None);

        assert!(run(&ctx, &["volume", "-2"]).is_success());

        let posts = transport.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].param("level"), Some("18"));
    }

    #[test]
    fn test_volume_without_value_only_reads() {
        let dir = TempDir::new().unwrap();
        let transport = player_with_status(0, "", "", 20);
        let ctx = context(&dir, &transport, &ScriptedPicker::default(), None);

        assert!(run(&ctx, &["volume"]).is_success());
        assert!(transport.posts().is_empty());
    }

    #[test]
    fn test_failed_ramp_reports_failure() {
        let dir = TempDir::new().unwrap();
        let transport = player_with_status(0, "", "", 20);
        transport.fail_posts();
        let ctx = context(&dir, &transport, &ScriptedPicker::default(), None);

        let outcome = run(&ctx, &["volume", "60"]);
        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(transport.posts().len(), 1);
    }

    #[test]
    fn test_abbreviated_pause_toggles() {
        let dir = TempDir::new().unwrap();
        let transport = FakeTransport::new();
        let ctx = context(&dir, &transport, &ScriptedPicker::default(), None);

        assert!(run(&ctx, &["pau"]).is_success());
        let posts = transport.posts();
        assert_eq!(posts[0].path, "Pause");
        assert_eq!(posts[0].param("toggle"), Some("1"));
    }

    #[test]
    fn test_ambiguous_and_unknown_commands() {
        let dir = TempDir::new().unwrap();
        let transport = FakeTransport::new();
        let ctx = context(&dir, &transport, &ScriptedPicker::default(), None);

        match run(&ctx, &["p"]) {
            Outcome::Ambiguous { candidates, .. } => assert_eq!(candidates, vec!["preview", "pause"]),
            other => panic!("expected ambiguity, got {other:?}"),
        }
        assert!(matches!(run(&ctx, &["frobnicate"]), Outcome::NotFound { .. }));
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn test_bad_arguments_are_usage_errors() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, &FakeTransport::new(), &ScriptedPicker::default(), None);

        let outcome = run(&ctx, &["volume", "loud"]);
        assert!(matches!(outcome, Outcome::Usage(_)));
        assert_eq!(outcome.exit_code(), 2);
        assert_eq!(run(&ctx, &["next", "--help"]).exit_code(), 0);
    }

    #[test]
    fn test_skip_and_back() {
        let dir = TempDir::new().unwrap();
        let transport = FakeTransport::new();
        let ctx = context(&dir, &transport, &ScriptedPicker::default(), None);

        assert!(run(&ctx, &["next"]).is_success());
        assert!(run(&ctx, &["back"]).is_success());
        let paths: Vec<String> = transport.posts().into_iter().map(|c| c.path).collect();
        assert_eq!(paths, vec!["Skip", "Back"]);
    }
}

#[cfg(test)]
mod queue_tests {
    use super::*;

    fn queue_player(current: u32) -> FakeTransport {
        let transport = player_with_status(current, "Miles Davis", "Kind of Blue", 30);
        transport.route(
            "Playlist",
            &[],
            &playlist_xml(&[
                (0, "Miles Davis", "Kind of Blue", 10),
                (1, "Miles Davis", "Kind of Blue", 10),
                (2, "John Coltrane", "Blue Train", 20),
                (3, "John Coltrane", "Blue Train", 20),
            ]),
        );
        transport
    }

    #[test]
    fn test_next_album_plays_first_song_of_next_album() {
        let dir = TempDir::new().unwrap();
        let transport = queue_player(1);
        let ctx = context(&dir, &transport, &ScriptedPicker::default(), None);

        assert!(run(&ctx, &["next", "-a"]).is_success());
        let posts = transport.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].path, "Play");
        assert_eq!(posts[0].param("id"), Some("2"));
    }

    #[test]
    fn test_queue_overview_reads_live() {
        let dir = TempDir::new().unwrap();
        let transport = queue_player(1);
        let ctx = context(&dir, &transport, &ScriptedPicker::default(), None);

        assert!(run(&ctx, &["queue"]).is_success());
        assert!(run(&ctx, &["queue"]).is_success());
        assert_eq!(transport.gets_to("Playlist"), 2);
        assert_eq!(transport.gets_to("Status"), 2);
    }

    #[test]
    fn test_list_plays_picked_song() {
        let dir = TempDir::new().unwrap();
        let transport = queue_player(0);
        let picker = ScriptedPicker::new(&[&["Blue Train: Track 3"]]);
        let ctx = context(&dir, &transport, &picker, None);

        assert!(run(&ctx, &["li"]).is_success());
        let posts = transport.posts();
        assert_eq!(posts[0].path, "Play");
        assert_eq!(posts[0].param("id"), Some("3"));
    }

    #[test]
    fn test_list_without_selection_does_nothing() {
        let dir = TempDir::new().unwrap();
        let transport = queue_player(0);
        let ctx = context(&dir, &transport, &ScriptedPicker::default(), None);

        assert!(run(&ctx, &["list"]).is_success());
        assert!(transport.posts().is_empty());
    }

    #[test]
    fn test_cleanup_all_clears() {
        let dir = TempDir::new().unwrap();
        let transport = queue_player(0);
        let ctx = context(&dir, &transport, &ScriptedPicker::default(), None);

        assert!(run(&ctx, &["cleanup", "--all"]).is_success());
        let posts = transport.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].path, "Clear");
    }

    #[test]
    fn test_cleanup_deletes_head_until_current_is_first() {
        let dir = TempDir::new().unwrap();
        let transport = FakeTransport::new();
        let statuses = [
            status_xml(2, "John Coltrane", "Blue Train", 30),
            status_xml(1, "John Coltrane", "Blue Train", 30),
            status_xml(0, "John Coltrane", "Blue Train", 30),
        ];
        transport.after_deletes("Status", &[], &[&statuses[0], &statuses[1], &statuses[2]]);
        let ctx = context(&dir, &transport, &ScriptedPicker::default(), None);

        assert!(run(&ctx, &["cleanup"]).is_success());
        let posts = transport.posts();
        assert_eq!(posts.len(), 2);
        assert!(posts.iter().all(|c| c.path == "Delete" && c.param("id") == Some("0")));
    }

    #[test]
    fn test_cleanup_stops_when_player_never_catches_up() {
        let dir = TempDir::new().unwrap();
        let transport = player_with_status(2, "John Coltrane", "Blue Train", 30);
        let ctx = context(&dir, &transport, &ScriptedPicker::default(), None);

        assert!(run(&ctx, &["cleanup"]).is_success());
        assert_eq!(transport.posts().len(), 3);
    }

    #[test]
    fn test_cleanup_pick_removes_every_song_of_album() {
        let dir = TempDir::new().unwrap();
        let transport = player_with_status(0, "Miles Davis", "Kind of Blue", 30);
        let full = playlist_xml(&[
            (0, "Miles Davis", "Kind of Blue", 10),
            (1, "John Coltrane", "Blue Train", 20),
            (2, "John Coltrane", "Blue Train", 20),
            (3, "Bill Evans", "Waltz for Debby", 30),
        ]);
        let one_left = playlist_xml(&[
            (0, "Miles Davis", "Kind of Blue", 10),
            (1, "John Coltrane", "Blue Train", 20),
            (2, "Bill Evans", "Waltz for Debby", 30),
        ]);
        let none_left = playlist_xml(&[
            (0, "Miles Davis", "Kind of Blue", 10),
            (1, "Bill Evans", "Waltz for Debby", 30),
        ]);
        transport.after_deletes("Playlist", &[], &[&full, &one_left, &none_left]);
        let picker = ScriptedPicker::new(&[&["Blue Train"]]);
        let ctx = context(&dir, &transport, &picker, None);

        assert!(run(&ctx, &["cleanup", "--pick"]).is_success());
        let posts = transport.posts();
        assert!(posts.iter().all(|c| c.path == "Delete"));
        let positions: Vec<&str> = posts.iter().filter_map(|c| c.param("id")).collect();
        assert_eq!(positions, vec!["1", "1"]);
        assert_eq!(picker.prompts(), vec!["Remove album"]);
    }

    #[test]
    fn test_cleanup_with_nothing_played() {
        let dir = TempDir::new().unwrap();
        let transport = queue_player(0);
        let ctx = context(&dir, &transport, &ScriptedPicker::default(), None);

        assert!(run(&ctx, &["cl"]).is_success());
        assert!(transport.posts().is_empty());
    }
}

#[cfg(test)]
mod library_tests {
    use super::*;
    use blue::commands::add_lines;

    const ALBUMS: &[(&str, &str)] = &[
        ("Miles Davis", "Kind of Blue"),
        ("John Coltrane", "Blue Train"),
        ("Bill Evans", "Waltz for Debby"),
        ("Sonny Rollins", "Saxophone Colossus"),
    ];

    fn added_ids(transport: &FakeTransport) -> Vec<String> {
        transport
            .posts()
            .iter()
            .filter(|c| c.path == "Add")
            .filter_map(|c| c.param("albumid").map(str::to_string))
            .collect()
    }

    #[test]
    fn test_random_appends_without_repeating() {
        let dir = TempDir::new().unwrap();
        let transport = FakeTransport::new();
        library(&transport, ALBUMS);
        let ctx = context(&dir, &transport, &ScriptedPicker::default(), None);

        assert!(run(&ctx, &["random"]).is_success());
        let browses = transport.gets_to("Browse");
        assert!(run(&ctx, &["ran", "1"]).is_success());

        let ids = added_ids(&transport);
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        assert_eq!(transport.gets_to("Browse"), browses, "library walk is cached");

        let first = &transport.posts()[0];
        assert_eq!(first.param("playnow"), Some("-1"));
        assert_eq!(first.param("where"), Some("last"));
    }

    #[test]
    fn test_random_stops_when_library_is_exhausted() {
        let dir = TempDir::new().unwrap();
        let transport = FakeTransport::new();
        library(&transport, ALBUMS);
        let ctx = context(&dir, &transport, &ScriptedPicker::default(), None);

        assert!(run(&ctx, &["random", "10"]).is_success());
        let mut ids = added_ids(&transport);
        ids.sort();
        assert_eq!(ids, vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_location_name_with_apostrophe() {
        let dir = TempDir::new().unwrap();
        let transport = FakeTransport::new();
        library(&transport, ALBUMS);
        transport.route(
            "Browse",
            &[],
            r#"<browse><item text="Tidal" browseKey="Tidal:"/><item text="Bob's Music" browseKey="LOCAL"/></browse>"#,
        );
        let mut ctx = context(&dir, &transport, &ScriptedPicker::default(), None);
        ctx.config.media_location = "Bob's Music".to_string();

        assert!(run(&ctx, &["random", "10"]).is_success());
        assert_eq!(added_ids(&transport).len(), 4);
    }

    #[test]
    fn test_missing_location_fails() {
        let dir = TempDir::new().unwrap();
        let transport = FakeTransport::new();
        library(&transport, ALBUMS);
        let mut ctx = context(&dir, &transport, &ScriptedPicker::default(), None);
        ctx.config.media_location = "Nowhere".to_string();

        assert!(!run(&ctx, &["random"]).is_success());
        assert!(transport.posts().is_empty());
    }

    #[test]
    fn test_add_lines_matches_titles() {
        let dir = TempDir::new().unwrap();
        let transport = FakeTransport::new();
        library(&transport, ALBUMS);
        let ctx = context(&dir, &transport, &ScriptedPicker::default(), None);

        let lines = vec![
            "Bill Evans - Waltz for Debby".to_string(),
            "".to_string(),
            "Nobody - Nothing".to_string(),
            "Miles Davis - Kind of Blue".to_string(),
        ];
        let added = add_lines(&ctx.services(), lines).unwrap();
        assert_eq!(added, 2);
        let mut ids = added_ids(&transport);
        ids.sort();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_search_picks_artist_then_albums() {
        let dir = TempDir::new().unwrap();
        let transport = FakeTransport::new();
        library(&transport, ALBUMS);
        let picker = ScriptedPicker::new(&[&["John Coltrane"], &["Blue Train"], &[]]);
        let ctx = context(&dir, &transport, &picker, None);

        assert!(run(&ctx, &["se"]).is_success());
        assert_eq!(added_ids(&transport), vec!["2"]);
        assert_eq!(picker.prompts(), vec!["Artist", "John Coltrane", "Artist"]);
    }
}

#[cfg(test)]
mod online_tests {
    use super::*;

    fn online_player() -> FakeTransport {
        let transport = player_with_status(3, "Radiohead", "Kid A", 30);
        transport
            .route(
                "Albums",
                &[("service", "Tidal"), ("expr", "\"dummy\"")],
                &albums_xml(&[("55", "Portishead", "Dummy", "1994-08-22"), ("56", "Tricky", "Dummy Run", "2001-01-01")]),
            )
            .route(
                "Albums",
                &[("service", "Tidal"), ("expr", "\"Portishead Dummy\"")],
                &albums_xml(&[("57", "Various", "Dummy Covers", "2010-01-01"), ("55", "Portishead", "Dummy", "1994-08-22")]),
            )
            .route(
                "Albums",
                &[("service", "Tidal"), ("expr", "\"Massive Attack Mezzanine\"")],
                &albums_xml(&[("70", "Massive Attack", "Mezzanine", "1998-04-20"), ("71", "Massive Attack", "Mezzanine (Deluxe)", "2018-01-01")]),
            )
            .route(
                "Songs",
                &[("service", "Tidal"), ("albumid", "55")],
                "<songs><album><song><track>1</track><title>Mysterons</title><art>Portishead</art><alb>Dummy</alb>\
                 <quality>CD</quality><time>306</time><date>1994</date></song><song><track>2</track>\
                 <title>Sour Times</title><art>Portishead</art><alb>Dummy</alb><quality>CD</quality>\
                 <time>251</time><date>1994</date></song></album></songs>",
            );
        transport
    }

    fn adds(transport: &FakeTransport) -> Vec<String> {
        transport
            .posts()
            .iter()
            .filter(|c| c.path == "Add")
            .filter_map(|c| c.param("albumid").map(str::to_string))
            .collect()
    }

    const RECOMMENDATIONS: &str = "1. Portishead - Dummy\n2. Massive Attack - Mezzanine (1998)";

    #[test]
    fn test_online_album_search_adds_pick() {
        let dir = TempDir::new().unwrap();
        let transport = online_player();
        let picker = ScriptedPicker::new(&[&["Portishead: Dummy"]]);
        let ctx = context(&dir, &transport, &picker, None);

        assert!(run(&ctx, &["on", "se", "-a", "dummy"]).is_success());
        let posts = transport.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].param("service"), Some("Tidal"));
        assert_eq!(posts[0].param("albumid"), Some("55"));
        assert_eq!(posts[0].param("where"), Some("last"));
    }

    #[test]
    fn test_artist_search_follows_next_link() {
        let dir = TempDir::new().unwrap();
        let transport = FakeTransport::new();
        transport
            .route(
                "Artists",
                &[("service", "Tidal"), ("expr", "\"x\"")],
                r#"<artists nextlink="/Artists?service=Tidal&amp;expr=x&amp;start=30"><art artistid="1">A</art><art artistid="2">B</art></artists>"#,
            )
            .route(
                "Artists",
                &[("service", "Tidal"), ("start", "30")],
                r#"<artists><art artistid="3">C</art></artists>"#,
            );
        let ctx = context(&dir, &transport, &ScriptedPicker::default(), None);

        let artists = ctx.services().online().search_artists("x").unwrap();
        let names: Vec<&str> = artists.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(artists[2].id, "3");
        assert_eq!(transport.gets_to("Artists"), 2);
    }

    fn favourites_player() -> FakeTransport {
        let transport = online_player();
        transport
            .route(
                "Artists",
                &[("service", "Tidal"), ("category", "FAVOURITES"), ("sort", "recent")],
                r#"<artists><art artistid="1">Portishead</art><art artistid="2">Tricky</art><art artistid="3">Bjork</art></artists>"#,
            )
            .route(
                "Albums",
                &[("service", "Tidal"), ("artistid", "1")],
                &albums_xml(&[("55", "Portishead", "Dummy", "1994-08-22"), ("58", "Portishead", "Third", "2008-04-28")]),
            )
            .route(
                "Albums",
                &[("service", "Tidal"), ("artistid", "2")],
                &albums_xml(&[("61", "Tricky", "Ununiform", "2017-09-22"), ("60", "Tricky", "Maxinquaye", "1995-02-20")]),
            )
            .route(
                "Albums",
                &[("service", "Tidal"), ("artistid", "3")],
                &albums_xml(&[("80", "Bjork", "Homogenic", "1997-09-22")]),
            );
        transport
    }

    #[test]
    fn test_online_latest_adds_newest_album_per_recent_favourite() {
        let dir = TempDir::new().unwrap();
        let transport = favourites_player();
        let ctx = context(&dir, &transport, &ScriptedPicker::default(), None);

        assert!(run(&ctx, &["online", "latest", "2"]).is_success());
        assert_eq!(adds(&transport), vec!["58", "61"]);
        assert_eq!(transport.gets_to("Albums"), 2);
    }

    #[test]
    fn test_online_random_adds_album_of_a_favourite() {
        let dir = TempDir::new().unwrap();
        let transport = favourites_player();
        let ctx = context(&dir, &transport, &ScriptedPicker::default(), None);

        assert!(run(&ctx, &["online", "random", "1", "-R"]).is_success());
        let added = adds(&transport);
        assert_eq!(added.len(), 1);
        assert!(["55", "58", "60", "61", "80"].contains(&added[0].as_str()));
        assert_eq!(transport.posts()[0].param("where"), Some("last"));
    }

    #[test]
    fn test_online_group_requires_subcommand() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, &online_player(), &ScriptedPicker::default(), None);

        assert!(matches!(run(&ctx, &["online"]), Outcome::Usage(_)));
        assert!(!run(&ctx, &["online", "nope"]).is_success());
    }

    #[test]
    fn test_preview_tracks_is_cached() {
        let dir = TempDir::new().unwrap();
        let transport = online_player();
        let ctx = context(&dir, &transport, &ScriptedPicker::default(), None);

        assert!(run(&ctx, &["pre", "tracks", "55"]).is_success());
        assert!(run(&ctx, &["pre", "tr", "55"]).is_success());
        assert_eq!(transport.gets_to("Songs"), 1);
    }

    #[test]
    fn test_ai_without_key_fails() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, &online_player(), &ScriptedPicker::default(), None);

        match run(&ctx, &["ai"]) {
            Outcome::Failed(e) => assert!(format!("{e:#}").contains("API key")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_ai_test_mode_adds_nothing() {
        let dir = TempDir::new().unwrap();
        let transport = online_player();
        let recommender = CannedRecommender::new(RECOMMENDATIONS);
        let ctx = context(&dir, &transport, &ScriptedPicker::default(), Some(recommender.clone()));

        assert!(run(&ctx, &["ai", "--test"]).is_success());
        assert!(transport.posts().is_empty());
        // One list, one overall explanation, one per recommendation.
        assert_eq!(recommender.calls.get(), 4);
    }

    #[test]
    fn test_ai_adds_best_matches() {
        let dir = TempDir::new().unwrap();
        let transport = online_player();
        let recommender = CannedRecommender::new(RECOMMENDATIONS);
        let ctx = context(&dir, &transport, &ScriptedPicker::default(), Some(recommender.clone()));

        assert!(run(&ctx, &["ai"]).is_success());
        assert_eq!(adds(&transport), vec!["55", "70"]);

        // Same album again: every answer comes from the cache.
        assert!(run(&ctx, &["ai", "-t"]).is_success());
        assert_eq!(recommender.calls.get(), 4);
    }

    #[test]
    fn test_ai_needs_album_metadata() {
        let dir = TempDir::new().unwrap();
        let transport = player_with_status(0, "Radio Paradise", "", 30);
        let ctx = context(
            &dir,
            &transport,
            &ScriptedPicker::default(),
            Some(CannedRecommender::new(RECOMMENDATIONS)),
        );

        assert_eq!(run(&ctx, &["ai"]).exit_code(), 1);
    }
}

#[cfg(test)]
mod cache_tests {
    use super::*;

    #[test]
    fn test_cache_clear_empties_cache() {
        let dir = TempDir::new().unwrap();
        let transport = FakeTransport::new();
        library(&transport, &[("Miles Davis", "Kind of Blue"), ("John Coltrane", "Blue Train")]);
        let ctx = context(&dir, &transport, &ScriptedPicker::default(), None);

        assert!(run(&ctx, &["random"]).is_success());
        assert!(ctx.cache.len().unwrap() > 0);

        assert!(run(&ctx, &["cache", "--clear"]).is_success());
        assert_eq!(ctx.cache.len().unwrap(), 0);
        assert!(run(&ctx, &["cache"]).is_success());
    }
}

#[cfg(test)]
mod cli_tests {
    use std::process::Command;
    use tempfile::TempDir;

    fn blue(dir: &TempDir) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_blue"));
        command
            .env("BLUE_CACHE_DIR", dir.path())
            .env_remove("BLUE_HOST")
            .env_remove("BLUE_PORT")
            .env_remove("OPENAI_API_KEY");
        command
    }

    #[test]
    fn test_cli_help_lists_commands() {
        let dir = TempDir::new().unwrap();
        let output = blue(&dir).arg("--help").output().expect("Failed to run help");

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("--host"));
        assert!(stdout.contains("add-list"));
        assert!(stdout.contains("completion"));
    }

    #[test]
    fn test_cli_version_flag() {
        let dir = TempDir::new().unwrap();
        let output = blue(&dir).arg("--version").output().expect("Failed to run version");

        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).contains("blue"));
    }

    #[test]
    fn test_completion_generation() {
        let dir = TempDir::new().unwrap();
        let output = blue(&dir)
            .args(["completion", "bash"])
            .output()
            .expect("Failed to run completion");

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("blue"));
        assert!(stdout.contains("volume"));
    }

    #[test]
    fn test_unknown_command_exits_with_error() {
        let dir = TempDir::new().unwrap();
        let output = blue(&dir).arg("frobnicate").output().expect("Failed to run blue");

        assert_eq!(output.status.code(), Some(1));
        assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown command `frobnicate`"));
    }

    #[test]
    fn test_cache_command_shows_directory() {
        let dir = TempDir::new().unwrap();
        let output = blue(&dir).arg("cache").output().expect("Failed to run cache");

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains(&dir.path().display().to_string()));
    }

    #[test]
    fn test_unreachable_player_fails() {
        let dir = TempDir::new().unwrap();
        let output = blue(&dir)
            .args(["--host", "127.0.0.1", "--port", "9", "volume"])
            .output()
            .expect("Failed to run volume");

        assert_eq!(output.status.code(), Some(1));
        assert!(String::from_utf8_lossy(&output.stderr).contains("Cannot reach the player"));
    }
}
