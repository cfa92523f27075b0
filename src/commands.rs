//! # Commands
//!
//! The command tables and their handlers. Handlers stay thin: parse their
//! arguments, call into the domain modules through [`Services`], print plain
//! lines.
//!
//! Top-level names are resolved by prefix, so `blue ran 3`, `blue vol +5` and
//! `blue on se -a "kind of blue"` all work. `online` and `preview` are groups
//! with their own tables, resolved the same way.

use crate::alias::RegistrationError;
use crate::cli::{
    AiArgs, CacheArgs, CleanupArgs, CompletionArgs, FavouritesArgs, NextArgs, NoArgs, OnlineSearchArgs,
    PreviewArgs, RandomArgs, SearchArgs, VolumeArgs,
};
use crate::completion;
use crate::config::Config;
use crate::db::history_window;
use crate::dispatch::{command_tree, parse_args, CommandSpec, Registry, Services};
use crate::library::{self, find_album, pick_random, split_line, LibraryAlbum};
use crate::online::{best_match, latest, Album, Artist, OnlineService};
use crate::picker::{Choice, Prompt};
use crate::queue::{self, Playlist};
use crate::recommend::{Candidate, RecommendationService};
use anyhow::{bail, Context, Result};
use clap::CommandFactory;
use log::{info, warn};
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::io::{self, BufRead};

/// Top-level commands, in resolution order.
pub static COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "random",
        about: "Enqueue random albums from the library",
        args: RandomArgs::command,
        run: random,
    },
    CommandSpec {
        name: "add-list",
        about: "Enqueue `Artist - Album` lines read from stdin",
        args: NoArgs::command,
        run: add_list,
    },
    CommandSpec {
        name: "cleanup",
        about: "Delete played songs from the queue",
        args: CleanupArgs::command,
        run: cleanup,
    },
    CommandSpec {
        name: "search",
        about: "Browse the library and enqueue albums",
        args: SearchArgs::command,
        run: search,
    },
    CommandSpec {
        name: "preview",
        about: "Print album tracks or artist details (used by picker previews)",
        args: preview_command,
        run: preview,
    },
    CommandSpec {
        name: "online",
        about: "Search and enqueue from the streaming service",
        args: online_command,
        run: online,
    },
    CommandSpec {
        name: "volume",
        about: "Show or set the volume",
        args: VolumeArgs::command,
        run: volume,
    },
    CommandSpec {
        name: "ai",
        about: "Enqueue AI recommendations based on the playing album",
        args: AiArgs::command,
        run: ai,
    },
    CommandSpec {
        name: "next",
        about: "Skip to the next track or album",
        args: NextArgs::command,
        run: next,
    },
    CommandSpec {
        name: "queue",
        about: "Show the queued albums and the playing song",
        args: NoArgs::command,
        run: show_queue,
    },
    CommandSpec {
        name: "pause",
        about: "Pause or resume playback",
        args: NoArgs::command,
        run: pause,
    },
    CommandSpec {
        name: "back",
        about: "Go to the previous track",
        args: NoArgs::command,
        run: back,
    },
    CommandSpec {
        name: "list",
        about: "Pick a song from the queue and play it",
        args: NoArgs::command,
        run: list,
    },
    CommandSpec {
        name: "cache",
        about: "Show or clear the query cache",
        args: CacheArgs::command,
        run: cache,
    },
    CommandSpec {
        name: "completion",
        about: "Print a shell completion script",
        args: CompletionArgs::command,
        run: print_completion,
    },
];

const ONLINE_ABOUT: &str = "Search and enqueue from the streaming service";

pub static ONLINE_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "search",
        about: "Search artists (default), albums or songs, or browse favourites",
        args: OnlineSearchArgs::command,
        run: online_search,
    },
    CommandSpec {
        name: "random",
        about: "Add the latest album of N random favourite artists",
        args: FavouritesArgs::command,
        run: online_random,
    },
    CommandSpec {
        name: "latest",
        about: "Add the latest album of the N most recent favourite artists",
        args: FavouritesArgs::command,
        run: online_latest,
    },
];

const PREVIEW_ABOUT: &str = "Print album tracks or artist details";

pub static PREVIEW_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "tracks",
        about: "Show the tracks of an album",
        args: PreviewArgs::command,
        run: preview_tracks,
    },
    CommandSpec {
        name: "album",
        about: "Show an artist's info and albums",
        args: PreviewArgs::command,
        run: preview_album,
    },
];

/// The top-level command registry.
///
/// # Errors
///
/// [`RegistrationError`] if the table has duplicate names.
pub fn registry() -> Result<Registry, RegistrationError> {
    Registry::new(COMMANDS)
}

fn online_command() -> clap::Command {
    command_tree("online", ONLINE_ABOUT, ONLINE_COMMANDS)
}

fn preview_command() -> clap::Command {
    command_tree("preview", PREVIEW_ABOUT, PREVIEW_COMMANDS)
}

/// Run a nested command table. Without a sub-command, or with only options,
/// the group's help is shown.
fn run_group(
    services: &Services<'_>,
    name: &'static str,
    about: &'static str,
    specs: &'static [CommandSpec],
    args: &[String],
) -> Result<()> {
    match args.split_first() {
        Some((token, rest)) if !token.starts_with('-') => {
            Registry::new(specs)?.run(services, token, rest).into_result()
        }
        _ => {
            command_tree(name, about, specs)
                .bin_name(format!("blue {name}"))
                .subcommand_required(true)
                .arg_required_else_help(true)
                .try_get_matches_from(std::iter::once(name.to_string()).chain(args.iter().cloned()))?;
            Ok(())
        }
    }
}

/// The item a picker choice points at; choice values are indices.
fn chosen<'a, T>(items: &'a [T], choice: &Choice) -> Option<&'a T> {
    choice.value.parse::<usize>().ok().and_then(|index| items.get(index))
}

fn indexed<T>(items: &[T], label: impl Fn(&T) -> String) -> Vec<Choice> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| Choice::new(label(item), index.to_string()))
        .collect()
}

fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

/// Shell command that re-invokes this binary's `preview` group for the
/// highlighted picker item.
#[must_use]
pub fn preview_template(config: &Config, kind: &str) -> String {
    let exe = std::env::current_exe()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|_| "blue".to_string());
    format!(
        "{} --host {} --port {} --cache-dir {} preview {kind} {{value}}",
        shell_quote(&exe),
        shell_quote(&config.host),
        config.port,
        shell_quote(&config.cache_dir.display().to_string()),
    )
}

fn ask(prompt: &str) -> Result<String> {
    let answer: String = dialoguer::Input::new()
        .with_prompt(prompt)
        .interact_text()
        .with_context(|| format!("Failed to read {prompt}"))?;
    let answer = answer.trim().to_string();
    if answer.is_empty() {
        bail!("No {} given", prompt.to_lowercase());
    }
    Ok(answer)
}

// ---- library ----

fn random(s: &Services<'_>, args: &[String]) -> Result<()> {
    let args: RandomArgs = parse_args("random", args)?;
    let albums = s.library().albums().context("Failed to read the library")?;
    if albums.is_empty() {
        println!("The library has no albums.");
        return Ok(());
    }

    let history = s.history()?;
    let window = history_window(albums.len());
    let mut recent: HashSet<String> = history.recent(window)?.into_iter().collect();
    let mut rng = rand::thread_rng();

    for _ in 0..args.count {
        let Some(album) = pick_random(&albums, &recent, &mut rng) else {
            break;
        };
        library::enqueue(&s.control, album).with_context(|| format!("Failed to add {album}"))?;
        let label = album.history_label();
        history.record(&label)?;
        println!("{label} Added");
        recent.insert(label);
    }

    println!("{} albums and {} items in history.", albums.len(), history.len()?);
    let dropped = history.trim(window)?;
    info!("history trimmed to {window} entries ({dropped} dropped)");
    Ok(())
}

/// Enqueue library albums named by `Artist - Album` lines, in random order.
/// Returns how many were added.
///
/// # Errors
///
/// Fails if the library cannot be read or an enqueue request fails.
pub fn add_lines(s: &Services<'_>, lines: Vec<String>) -> Result<usize> {
    let mut lines: Vec<String> = lines
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();
    lines.shuffle(&mut rand::thread_rng());

    let albums = s.library().albums().context("Failed to read the library")?;
    let mut added = 0;
    for line in &lines {
        let Some((artist, album)) = split_line(line) else {
            println!("{line} FAIL");
            continue;
        };
        match find_album(&albums, artist, album) {
            Some(found) => {
                library::enqueue(&s.control, found).with_context(|| format!("Failed to add {found}"))?;
                println!("{artist}: {album} Added");
                added += 1;
            }
            None => println!("{artist}: {album} FAIL"),
        }
    }
    println!("Added {added} albums");
    Ok(added)
}

fn add_list(s: &Services<'_>, args: &[String]) -> Result<()> {
    let _: NoArgs = parse_args("add-list", args)?;
    let lines = io::stdin()
        .lock()
        .lines()
        .collect::<io::Result<Vec<String>>>()
        .context("Failed to read the album list from stdin")?;
    add_lines(s, lines).map(|_| ())
}

fn enqueue_all(s: &Services<'_>, albums: &[&LibraryAlbum]) -> Result<()> {
    for album in albums {
        library::enqueue(&s.control, album).with_context(|| format!("Failed to add {album}"))?;
        println!("{album} Added");
    }
    Ok(())
}

fn search(s: &Services<'_>, args: &[String]) -> Result<()> {
    let args: SearchArgs = parse_args("search", args)?;
    let albums = s.library().albums().context("Failed to read the library")?;

    if args.album {
        let mut titles: Vec<&LibraryAlbum> = albums.iter().collect();
        titles.sort_by(|a, b| a.album.cmp(&b.album));
        titles.dedup_by(|a, b| a.album == b.album);
        let choices = indexed(&titles, |album| album.album.clone());
        loop {
            let picked = s.picker.pick_many(&Prompt::new("Album"), &choices)?;
            if picked.is_empty() {
                println!("No album selected.");
                return Ok(());
            }
            let selected: Vec<&LibraryAlbum> = picked.iter().filter_map(|c| chosen(&titles, c).copied()).collect();
            enqueue_all(s, &selected)?;
        }
    }

    let artists: Vec<Choice> = library::artists(&albums).into_iter().map(Choice::plain).collect();
    loop {
        let Some(artist) = s.picker.pick(&Prompt::new("Artist"), &artists)? else {
            println!("No artist selected.");
            return Ok(());
        };
        let by_artist = library::albums_by(&albums, &artist.value);
        let choices = indexed(&by_artist, |album| album.album.clone());
        let picked = s.picker.pick_many(&Prompt::new(&artist.label), &choices)?;
        let selected: Vec<&LibraryAlbum> = picked.iter().filter_map(|c| chosen(&by_artist, c).copied()).collect();
        enqueue_all(s, &selected)?;
    }
}

// ---- queue ----

fn cleanup(s: &Services<'_>, args: &[String]) -> Result<()> {
    let args: CleanupArgs = parse_args("cleanup", args)?;

    if args.all {
        s.control.clear().context("Failed to clear the queue")?;
        println!("Queue cleared.");
        return Ok(());
    }

    if args.pick {
        let playlist = Playlist::fetch(&s.query).context("Failed to read the queue")?;
        let albums = playlist.albums();
        let choices = indexed(&albums, queue::QueuedAlbum::label);
        let Some(choice) = s.picker.pick(&Prompt::new("Remove album"), &choices)? else {
            println!("No album selected.");
            return Ok(());
        };
        let Some(album) = chosen(&albums, &choice) else {
            return Ok(());
        };
        let removed = queue::remove_album(&s.query, &s.control, album.album_id)?;
        println!("Removed {removed} songs of {} - {}", album.artist, album.album);
        return Ok(());
    }

    let removed = queue::cleanup_played(&s.query, &s.control)?;
    println!("Removed {removed} played songs.");
    Ok(())
}

fn next(s: &Services<'_>, args: &[String]) -> Result<()> {
    let args: NextArgs = parse_args("next", args)?;
    if !args.album {
        s.control.skip().context("Failed to skip")?;
        return Ok(());
    }
    match queue::next_album(&s.query, &s.control)? {
        Some(song) => println!("Playing {song}"),
        None => println!("No next album in the queue."),
    }
    Ok(())
}

fn show_queue(s: &Services<'_>, args: &[String]) -> Result<()> {
    let _: NoArgs = parse_args("queue", args)?;
    let status = s.query.status().context("Failed to read player status")?;
    let playlist = Playlist::fetch(&s.query).context("Failed to read the queue")?;
    if playlist.is_empty() {
        println!("The queue is empty.");
        return Ok(());
    }
    for line in queue::overview(&playlist, &status) {
        println!("{line}");
    }
    Ok(())
}

fn list(s: &Services<'_>, args: &[String]) -> Result<()> {
    let _: NoArgs = parse_args("list", args)?;
    let playlist = Playlist::fetch(&s.query).context("Failed to read the queue")?;
    let status = s.query.status().context("Failed to read player status")?;

    let choices: Vec<Choice> = playlist
        .songs
        .iter()
        .map(|song| Choice::new(song.to_string(), song.id.to_string()))
        .collect();
    let title = format!("{} {}", status.song_id.unwrap_or(0), status.artist);
    let Some(choice) = s.picker.pick(&Prompt::new(&title), &choices)? else {
        println!("No song selected.");
        return Ok(());
    };
    let id: u32 = choice
        .value
        .parse()
        .with_context(|| format!("Invalid song id {}", choice.value))?;
    s.control.play_id(id).with_context(|| format!("Failed to play song {id}"))?;
    Ok(())
}

fn pause(s: &Services<'_>, args: &[String]) -> Result<()> {
    let _: NoArgs = parse_args("pause", args)?;
    s.control.pause().context("Failed to toggle pause")?;
    Ok(())
}

fn back(s: &Services<'_>, args: &[String]) -> Result<()> {
    let _: NoArgs = parse_args("back", args)?;
    s.control.back().context("Failed to go back")?;
    Ok(())
}

fn volume(s: &Services<'_>, args: &[String]) -> Result<()> {
    let args: VolumeArgs = parse_args("volume", args)?;
    let current = s.query.volume().context("Failed to read the volume")?;
    println!("Volume is {current}");

    let Some(target) = args.value else {
        return Ok(());
    };
    let change = s.control.set_volume(target.resolve(current))?;
    println!("{change}");
    Ok(())
}

// ---- streaming service ----

fn online(s: &Services<'_>, args: &[String]) -> Result<()> {
    run_group(s, "online", ONLINE_ABOUT, ONLINE_COMMANDS, args)
}

/// Pick an album from `albums` and add it. Returns false when nothing was
/// picked.
fn pick_album(s: &Services<'_>, service: &OnlineService<'_>, albums: &[Album]) -> Result<bool> {
    if albums.is_empty() {
        println!("No albums found.");
        return Ok(false);
    }
    let preview = preview_template(s.config, "tracks");
    let choices: Vec<Choice> = albums.iter().map(|a| Choice::new(a.label(), a.id.clone())).collect();
    let Some(choice) = s.picker.pick(&Prompt::new("Album").with_preview(&preview), &choices)? else {
        println!("No album selected.");
        return Ok(false);
    };
    service
        .add_album(&s.control, &choice.value)
        .with_context(|| format!("Failed to add {}", choice.label))?;
    println!("Added {} to queue.", choice.label);
    Ok(true)
}

/// Artist, then album, repeatedly, until the user picks nothing.
fn browse_artists(s: &Services<'_>, service: &OnlineService<'_>, artists: &[Artist]) -> Result<()> {
    if artists.is_empty() {
        println!("No artists found.");
        return Ok(());
    }
    let preview = preview_template(s.config, "album");
    let choices: Vec<Choice> = artists.iter().map(|a| Choice::new(a.name.clone(), a.id.clone())).collect();
    loop {
        let Some(artist) = s.picker.pick(&Prompt::new("Artist").with_preview(&preview), &choices)? else {
            println!("No artist selected.");
            return Ok(());
        };
        let albums = service
            .artist_albums(&artist.value)
            .with_context(|| format!("Failed to list albums of {}", artist.label))?;
        pick_album(s, service, &albums)?;
    }
}

fn online_search(s: &Services<'_>, args: &[String]) -> Result<()> {
    let args: OnlineSearchArgs = parse_args("search", args)?;
    let service = s.online();

    if args.favourites {
        let artists = service.favourite_artists().context("Failed to list favourite artists")?;
        return browse_artists(s, &service, &artists);
    }

    if args.album {
        let keyword = match args.keyword {
            Some(keyword) => keyword,
            None => ask("Album")?,
        };
        let albums = service.search_albums(&keyword).context("Album search failed")?;
        pick_album(s, &service, &albums)?;
        return Ok(());
    }

    if args.song {
        let keyword = match args.keyword {
            Some(keyword) => keyword,
            None => ask("Song")?,
        };
        let songs = service.search_songs(&keyword).context("Song search failed")?;
        if songs.is_empty() {
            println!("No song found.");
            return Ok(());
        }
        let choices = indexed(&songs, |song| song.label());
        let Some(song) = s
            .picker
            .pick(&Prompt::new("Song"), &choices)?
            .and_then(|choice| chosen(&songs, &choice).cloned())
        else {
            println!("No song selected.");
            return Ok(());
        };
        service
            .add_song(&s.control, &song)
            .with_context(|| format!("Failed to add {}", song.title))?;
        println!("Added {} to queue.", song.label());
        return Ok(());
    }

    let keyword = match args.keyword {
        Some(keyword) => keyword,
        None => ask("Artist")?,
    };
    let artists = service.search_artists(&keyword).context("Artist search failed")?;
    browse_artists(s, &service, &artists)
}

/// Add one album from each of the first `count` favourite artists.
fn add_from_favourites(s: &Services<'_>, args: &FavouritesArgs, shuffle: bool) -> Result<()> {
    let service = s.online();
    let mut artists = service.favourite_artists().context("Failed to list favourite artists")?;
    let mut rng = rand::thread_rng();
    if shuffle {
        artists.shuffle(&mut rng);
    }

    let mut added = Vec::new();
    for artist in artists.iter().take(args.count) {
        let albums = service
            .artist_albums(&artist.id)
            .with_context(|| format!("Failed to list albums of {}", artist.name))?;
        let album = if args.random {
            albums.choose(&mut rng)
        } else {
            latest(&albums)
        };
        let Some(album) = album else {
            warn!("{} has no albums", artist.name);
            continue;
        };
        service
            .add_album(&s.control, &album.id)
            .with_context(|| format!("Failed to add {}", album.title))?;
        added.push(format!("{}: {}", artist.name, album.title));
    }

    println!(
        "Added {} albums from favourite artists:",
        if args.random { "random" } else { "latest" }
    );
    for line in &added {
        println!("- {line}");
    }
    Ok(())
}

fn online_random(s: &Services<'_>, args: &[String]) -> Result<()> {
    let args: FavouritesArgs = parse_args("random", args)?;
    add_from_favourites(s, &args, true)
}

fn online_latest(s: &Services<'_>, args: &[String]) -> Result<()> {
    let args: FavouritesArgs = parse_args("latest", args)?;
    add_from_favourites(s, &args, false)
}

fn preview(s: &Services<'_>, args: &[String]) -> Result<()> {
    run_group(s, "preview", PREVIEW_ABOUT, PREVIEW_COMMANDS, args)
}

fn preview_tracks(s: &Services<'_>, args: &[String]) -> Result<()> {
    let args: PreviewArgs = parse_args("tracks", args)?;
    let tracks = s.online().album_tracks(&args.id).context("Failed to read the album")?;
    let Some(first) = tracks.first() else {
        println!("No tracks found.");
        return Ok(());
    };
    println!("Artist: {}", first.artist);
    println!("Album: {} {}", first.album, first.date);
    for track in &tracks {
        println!("{track}");
    }
    Ok(())
}

fn preview_album(s: &Services<'_>, args: &[String]) -> Result<()> {
    let args: PreviewArgs = parse_args("album", args)?;
    let service = s.online();
    match service.artist_info(&args.id) {
        Ok(info) if !info.is_empty() => println!("{info}\n"),
        Ok(_) => {}
        Err(e) => warn!("No artist info for {}: {e}", args.id),
    }
    let albums = service.artist_albums(&args.id).context("Failed to list albums")?;
    if albums.is_empty() {
        println!("No albums found.");
    }
    for album in &albums {
        println!("{album}");
    }
    Ok(())
}

// ---- recommendations ----

fn explain(service: &RecommendationService<'_>, artist: &str, album: &str, candidates: &[Candidate]) {
    println!("\nAI Explanation");
    match service.explain_all(artist, album, candidates) {
        Ok(text) => println!("\nWhy these recommendations?\n{text}"),
        Err(e) => warn!("Failed to get the general explanation: {e}"),
    }

    println!("\nIndividual explanations:");
    for (number, candidate) in candidates.iter().enumerate() {
        match service.explain_one(artist, album, candidate) {
            Ok(text) => println!("\n{}. {candidate}\n   {text}", number + 1),
            Err(e) => warn!("Failed to explain {candidate}: {e}"),
        }
    }
}

fn ai(s: &Services<'_>, args: &[String]) -> Result<()> {
    let args: AiArgs = parse_args("ai", args)?;
    let status = s.query.status().context("Failed to read player status")?;
    if status.artist.is_empty() || !status.has_album() {
        bail!("The playing song has no artist or album to base recommendations on");
    }
    let service = s.recommendations()?;
    let (artist, album) = (status.artist.as_str(), status.album.as_str());

    if args.test {
        println!("TEST MODE: Getting AI recommendations for: {artist} - {album}");
    } else {
        println!("Getting AI recommendations for: {artist} - {album}");
    }
    let recommendations = service
        .recommend(artist, album, &s.config.keys.exclude())
        .context("Failed to get AI recommendations")?;
    println!("\nAI Recommendations:\n{}\n", recommendations.text);

    let online = s.online();
    let mut found = 0;
    for candidate in &recommendations.candidates {
        if args.test {
            println!("Searching for: {candidate}");
        }
        let albums = match online.search_albums(&format!("{} {}", candidate.artist, candidate.album)) {
            Ok(albums) => albums,
            Err(e) => {
                println!("  Error searching {candidate}: {e}");
                continue;
            }
        };
        let Some(best) = best_match(&albums, &candidate.artist) else {
            println!("  No results found for {candidate}");
            continue;
        };

        if args.test {
            println!(
                "  Found: {} - {} ({}) - {} tracks",
                best.artist, best.title, best.date, best.tracks
            );
            found += 1;
            continue;
        }
        match online.add_album(&s.control, &best.id) {
            Ok(()) => {
                println!("Added {} - {} to queue.", best.artist, best.title);
                found += 1;
            }
            Err(e) => warn!("Failed to add {} - {}: {e}", best.artist, best.title),
        }
    }

    if args.test {
        println!(
            "\nTest Summary: Found {found} out of {} recommendations on {}",
            recommendations.candidates.len(),
            online.service()
        );
        println!("Run without --test to actually add albums to queue");
    } else {
        println!("\nSuccessfully added {found} albums to queue!");
    }

    if !recommendations.candidates.is_empty() {
        explain(&service, artist, album, &recommendations.candidates);
    }
    Ok(())
}

// ---- housekeeping ----

fn cache(s: &Services<'_>, args: &[String]) -> Result<()> {
    let args: CacheArgs = parse_args("cache", args)?;
    if args.clear {
        let removed = s.cache.clear()?;
        println!("Removed {removed} cached entries from {}", s.cache.dir().display());
    } else {
        println!("Cache directory: {}", s.cache.dir().display());
        println!("Entries: {}", s.cache.len()?);
    }
    Ok(())
}

fn print_completion(_: &Services<'_>, args: &[String]) -> Result<()> {
    let args: CompletionArgs = parse_args("completion", args)?;
    let mut command = completion::completion_command(COMMANDS);
    completion::generate_completions(completion::shell_to_completion_shell(&args.shell), &mut command);
    Ok(())
}
