//! Display scenarios: static images, raw pixels and animation playback

mod common;

use common::*;
use embassy_futures::block_on;
use embassy_futures::select::{select3, Either3};
use embassy_futures::yield_now;
use modlink_core::anim::Phase;
use modlink_core::{ModuleConfig, TickOutcome};
use modlink_hal::FileStore;
use modlink_hal_ram::RamStore;
use modlink_protocol::{CommandId, Status};

fn frame_of(byte: u8) -> Vec<u8> {
    vec![byte; FRAME]
}

#[test]
fn test_static_image_is_zero_filled() {
    let mut store = RamStore::mounted();
    put_file(&mut store, "/pic.raw", &[9; 5]);
    put_file(&mut store, "/empty.raw", &[]);
    let storage = TestStore::new(store);
    let player = TestPlayer::new(RecordingDisplay::default());
    let mut host = Host::new(&storage, &player, ModuleConfig::default());

    run(&storage, &player, async {
        assert_eq!(host.status(CommandId::ChooseImage, b"/pic.raw").await, Status::Success);
        assert_eq!(
            host.status(CommandId::ChooseImage, b"/empty.raw").await,
            Status::HeightOutOfBounds
        );
        assert_eq!(
            host.status(CommandId::ChooseImage, b"/missing.raw").await,
            Status::NotFound
        );
    });

    assert!(!player.is_playing());
    assert_eq!(player.on_frame_tick(), TickOutcome::Idle);
    player.with_display(|d| {
        assert_eq!(d.frames, vec![vec![9, 9, 9, 9, 9, 0, 0, 0]]);
        assert_eq!(d.releases, 0);
    });
}

#[test]
fn test_animation_plays_in_order() {
    let mut store = RamStore::mounted();
    put_file(&mut store, "/spin.araw", &animation(3));
    let storage = TestStore::new(store);
    let player = TestPlayer::new(RecordingDisplay::default());
    let mut host = Host::new(&storage, &player, ModuleConfig::default());

    let shown = run(&storage, &player, async {
        assert_eq!(
            host.status(CommandId::ChooseImage, b"/spin.araw").await,
            Status::Success
        );
        assert!(player.is_playing());
        assert_eq!(player.phase(), Phase::Loading);
        assert_eq!(player.frame_count(), 3);

        let mut shown = Vec::new();
        for _ in 0..7 {
            shown.push(next_frame(&player).await);
        }
        assert_eq!(player.phase(), Phase::Playing);
        shown
    });

    assert_eq!(shown, vec![0, 1, 2, 0, 1, 2, 0]);
    player.with_display(|d| {
        let expected: Vec<Vec<u8>> = shown.iter().map(|&f| frame_of(f as u8 + 1)).collect();
        assert_eq!(d.frames, expected);
    });
}

#[test]
fn test_trailing_partial_frame_ignored() {
    let mut store = RamStore::mounted();
    let mut data = animation(2);
    data.extend_from_slice(&[0xEE; 3]);
    put_file(&mut store, "/odd.araw", &data);
    put_file(&mut store, "/short.araw", &[1; FRAME - 1]);
    let storage = TestStore::new(store);
    let player = TestPlayer::new(RecordingDisplay::default());
    let mut host = Host::new(&storage, &player, ModuleConfig::default());

    run(&storage, &player, async {
        assert_eq!(
            host.status(CommandId::ChooseImage, b"/short.araw").await,
            Status::HeightOutOfBounds
        );
        assert!(!player.is_playing());

        assert_eq!(
            host.status(CommandId::ChooseImage, b"/odd.araw").await,
            Status::Success
        );
        assert_eq!(player.frame_count(), 2);
        for expected in [0, 1, 0, 1] {
            assert_eq!(next_frame(&player).await, expected);
        }
    });
    player.with_display(|d| assert!(d.frames.iter().all(|f| f[0] != 0xEE)));
}

#[test]
fn test_switching_animations_releases_old_file() {
    let mut store = RamStore::mounted();
    put_file(&mut store, "/a.araw", &animation(2));
    let b: Vec<u8> = (0..3u8).flat_map(|i| frame_of(0x10 + i)).collect();
    put_file(&mut store, "/b.araw", &b);
    let storage = TestStore::new(store);
    let player = TestPlayer::new(RecordingDisplay::default());
    let mut host = Host::new(&storage, &player, ModuleConfig::default());

    let (reads_at_switch, shown_before) = run(&storage, &player, async {
        host.status(CommandId::ChooseImage, b"/a.araw").await;
        next_frame(&player).await;
        next_frame(&player).await;

        assert_eq!(host.status(CommandId::ChooseImage, b"/b.araw").await, Status::Success);
        let reads = storage.lock().await.reads_of("/a.araw");
        let shown = player.with_display(|d| d.frames.len());

        for _ in 0..5 {
            next_frame(&player).await;
        }
        (reads, shown)
    });

    let store = block_on(storage.lock());
    assert_eq!(store.reads_of("/a.araw"), reads_at_switch);
    assert!(store.reads_of("/b.araw") > 0);
    assert_eq!(store.stale_accesses(), 0);
    drop(store);

    assert_eq!(player.frame_count(), 3);
    player.with_display(|d| {
        assert_eq!(d.releases, 1);
        assert_eq!(d.frames.len(), shown_before + 5);
        assert!(d.frames[shown_before..].iter().all(|f| f[0] >= 0x10));
        assert_eq!(d.frames[shown_before], frame_of(0x10));
    });
}

#[test]
fn test_format_during_animation() {
    let mut store = RamStore::mounted();
    put_file(&mut store, "/spin.araw", &animation(4));
    let storage = TestStore::new(store);
    let player = TestPlayer::new(RecordingDisplay::default());
    let mut host = Host::new(&storage, &player, ModuleConfig::default());

    run(&storage, &player, async {
        host.status(CommandId::ChooseImage, b"/spin.araw").await;
        next_frame(&player).await;

        assert_eq!(
            host.status(CommandId::FormatFilesystem, &[]).await,
            Status::Success
        );
        assert!(!player.is_playing());
        assert_eq!(player.on_frame_tick(), TickOutcome::Idle);

        // The loader is back to sleep and the store is usable
        for _ in 0..10 {
            yield_now().await;
        }
        let (_, listing) = host.ls().await;
        assert!(listing.is_empty());
    });

    assert_eq!(block_on(storage.lock()).stale_accesses(), 0);
    player.with_display(|d| assert_eq!(d.releases, 1));
}

#[test]
fn test_read_fault_freezes_playback() {
    let mut store = RamStore::mounted();
    put_file(&mut store, "/spin.araw", &animation(2));
    let storage = TestStore::new(store);
    let player = TestPlayer::new(RecordingDisplay::default());
    let mut host = Host::new(&storage, &player, ModuleConfig::default());

    run(&storage, &player, async {
        host.status(CommandId::ChooseImage, b"/spin.araw").await;
        next_frame(&player).await;

        storage.lock().await.set_read_fault(Some("/spin.araw"));

        // At most the frame already loaded gets through
        let mut presented = 0;
        for _ in 0..200 {
            if let TickOutcome::Presented { .. } = player.on_frame_tick() {
                presented += 1;
            }
            yield_now().await;
        }
        assert!(presented <= 1);
        assert_eq!(player.on_frame_tick(), TickOutcome::Skipped);
        assert!(player.is_playing());

        // Commands keep working while frozen
        let replies = host.call(CommandId::Pwd, &[]).await;
        assert_eq!(replies[0].payload(), b"/");

        storage.lock().await.set_read_fault(None);
        next_frame(&player).await;
        next_frame(&player).await;

        assert_eq!(host.status(CommandId::Rm, b"/spin.araw").await, Status::Success);
    });
    // rm does not stop playback; the handle outlives the name
    assert!(player.is_playing());
}

#[test]
fn test_write_display_replaces_animation() {
    let mut store = RamStore::mounted();
    put_file(&mut store, "/spin.araw", &animation(2));
    let storage = TestStore::new(store);
    let player = TestPlayer::new(RecordingDisplay::default());
    let mut host = Host::new(&storage, &player, ModuleConfig::default());

    run(&storage, &player, async {
        host.status(CommandId::ChooseImage, b"/spin.araw").await;
        next_frame(&player).await;
        let before = player.with_display(|d| d.frames.len());

        assert_eq!(
            host.status(CommandId::WriteDisplay, &[0xA0; 5]).await,
            Status::Success
        );
        assert!(!player.is_playing());
        player.with_display(|d| {
            assert_eq!(d.releases, 1);
            assert_eq!(d.frames.len(), before);
        });

        assert_eq!(
            host.status(CommandId::WriteDisplay, &[0xA1; 3]).await,
            Status::Success
        );
        player.with_display(|d| {
            assert_eq!(d.frames.len(), before + 1);
            assert_eq!(d.frames[before], [0xA0, 0xA0, 0xA0, 0xA0, 0xA0, 0xA1, 0xA1, 0xA1]);
        });

        // 6 + 5 bytes: the frame fills, 3 bytes are dropped
        host.status(CommandId::WriteDisplay, &[0xB0; 6]).await;
        assert_eq!(
            host.status(CommandId::WriteDisplay, &[0xB1; 5]).await,
            Status::WidthOutOfBounds
        );
        player.with_display(|d| {
            assert_eq!(d.frames.len(), before + 2);
            assert_eq!(d.frames[before + 1], [0xB0, 0xB0, 0xB0, 0xB0, 0xB0, 0xB0, 0xB1, 0xB1]);
        });

        // Cursor restarted at the frame origin
        assert_eq!(
            host.status(CommandId::WriteDisplay, &[0xC0; FRAME]).await,
            Status::Success
        );
        player.with_display(|d| assert_eq!(d.frames.last(), Some(&frame_of(0xC0))));

        assert_eq!(
            host.status(CommandId::WriteDisplay, &[]).await,
            Status::InvalidCommand
        );
    });
    player.with_display(|d| assert_eq!(d.releases, 1));
}

#[test]
fn test_stop_animation() {
    let mut store = RamStore::mounted();
    put_file(&mut store, "/spin.araw", &animation(2));
    let storage = TestStore::new(store);
    let player = TestPlayer::new(RecordingDisplay::default());
    let mut host = Host::new(&storage, &player, ModuleConfig::default());

    run(&storage, &player, async {
        host.status(CommandId::ChooseImage, b"/spin.araw").await;
        next_frame(&player).await;

        assert!(host.module.stop_animation().await);
        assert!(!host.module.stop_animation().await);
        assert_eq!(player.phase(), Phase::Idle);

        // The file handle is closed: the name can go
        assert_eq!(host.status(CommandId::Rm, b"/spin.araw").await, Status::Success);
    });
    player.with_display(|d| assert_eq!(d.releases, 1));
}

#[test]
fn test_choose_image_relative_to_cwd() {
    let mut store = RamStore::mounted();
    store.mkdir("/img").unwrap();
    put_file(&mut store, "/img/spin.araw", &animation(2));
    let storage = TestStore::new(store);
    let player = TestPlayer::new(RecordingDisplay::default());
    let mut config = ModuleConfig::default();
    config.protocol.paths = modlink_core::config::PathResolution::RelativeToCwd;
    let mut host = Host::new(&storage, &player, config);

    run(&storage, &player, async {
        assert_eq!(host.status(CommandId::Cd, b"img").await, Status::Success);
        assert_eq!(
            host.status(CommandId::ChooseImage, b"spin.araw").await,
            Status::Success
        );
        assert_eq!(next_frame(&player).await, 0);
    });
}

#[test]
fn test_frame_timer_task() {
    let mut store = RamStore::mounted();
    put_file(&mut store, "/spin.araw", &animation(3));
    let storage = TestStore::new(store);
    let player = TestPlayer::new(RecordingDisplay::default());
    let mut host = Host::new(&storage, &player, ModuleConfig::default());
    let interval = host.module.config().display.frame_interval_ms();

    let result = block_on(async {
        let mut loader_delay = YieldDelay;
        let mut timer_delay = YieldDelay;
        select3(
            player.run_loader(&storage, &mut loader_delay, interval / 4),
            player.run_frame_timer(&mut timer_delay, interval),
            async {
                host.status(CommandId::ChooseImage, b"/spin.araw").await;
                while player.with_display(|d| d.frames.len()) < 4 {
                    yield_now().await;
                }
            },
        )
        .await
    });

    assert!(matches!(result, Either3::Third(())));
    player.with_display(|d| {
        assert_eq!(&d.frames[..4], &[frame_of(1), frame_of(2), frame_of(3), frame_of(1)]);
    });
}
