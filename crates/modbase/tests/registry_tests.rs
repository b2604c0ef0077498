// Registry behaviour across registration, console input, keys and reloads

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use modbase::{
    value_parser, Arg, Command, CommandError, Hook, HookDispatcher, HookEvent, HookSignal, Host,
    InputEvent, Keybind, KeybindSignal, ModOption, ModRegistry, ModTemplate, ModType,
    NoKeybindBackend, RegistryError,
};
use parking_lot::Mutex;
use tempfile::TempDir;

fn registry(dir: &TempDir) -> (ModRegistry, HookDispatcher) {
    let dispatcher = HookDispatcher::new();
    let host = Host::new(dispatcher.clone(), NoKeybindBackend);
    (
        ModRegistry::new(host, Some(dir.path().to_path_buf())),
        dispatcher,
    )
}

fn names(mods: &[modbase::Mod]) -> Vec<String> {
    mods.iter().map(|m| m.name().to_string()).collect()
}

#[test]
fn test_menu_order() {
    let dir = TempDir::new().unwrap();
    let (mut registry, _) = registry(&dir);

    registry
        .build_and_register(ModTemplate::new("zeta"))
        .unwrap();
    registry
        .build_and_register(ModTemplate::new("Helpers").mod_type(ModType::Library))
        .unwrap();
    registry
        .build_and_register(ModTemplate::new("Alpha"))
        .unwrap();
    registry
        .build_and_register_base(ModTemplate::new("Mod Menu"))
        .unwrap();

    assert_eq!(
        names(&registry.ordered_mods()),
        vec!["Mod Menu", "Alpha", "zeta", "Helpers"]
    );
    assert_eq!(registry.base_mod().unwrap().name(), "Mod Menu");
}

#[test]
fn test_reregistering_same_settings_file_replaces() {
    let dir = TempDir::new().unwrap();
    let (mut registry, _) = registry(&dir);

    let first = registry
        .build_and_register(ModTemplate::new("Twice"))
        .unwrap();
    let second = registry
        .build_and_register(ModTemplate::new("Twice"))
        .unwrap();

    assert_eq!(registry.mods().len(), 1);
    assert!(registry.get("Twice").unwrap().ptr_eq(&second));
    assert!(!registry.deregister_mod(&first));
}

#[test]
fn test_reload_keeps_one_instance_and_enabled_state() {
    let dir = TempDir::new().unwrap();
    let (mut registry, dispatcher) = registry(&dir);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let template = ModTemplate::new("Reloadable")
        .option(ModOption::bool("loud", false))
        .hook(Hook::pre("count", "tick", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            HookSignal::Continue
        }));
    let before = registry.build_and_register(template).unwrap();
    registry.enable_mod("Reloadable").unwrap();
    before.set_option_value("loud", true).unwrap();

    for _ in 0..3 {
        assert!(registry.reload().is_empty());
    }

    assert_eq!(registry.mods().len(), 1);
    let after = registry.get("Reloadable").unwrap();
    assert!(!after.ptr_eq(&before));
    assert!(after.is_enabled());
    assert!(!before.is_enabled());
    assert_eq!(after.bool_value("loud"), Some(true));

    assert_eq!(dispatcher.hook_count("tick"), 1);
    dispatcher.dispatch(&mut HookEvent::new("tick"), |_| {});
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_reload_keeps_disabled_mods_disabled() {
    let dir = TempDir::new().unwrap();
    let (mut registry, _) = registry(&dir);

    registry
        .build_and_register(ModTemplate::new("Sleepy"))
        .unwrap();
    registry.enable_mod("Sleepy").unwrap();
    registry.disable_mod("Sleepy").unwrap();
    registry.reload();

    assert!(!registry.get("Sleepy").unwrap().is_enabled());
}

#[test]
fn test_enabled_mod_restored_by_new_registry() {
    let dir = TempDir::new().unwrap();
    {
        let (mut registry, _) = registry(&dir);
        registry
            .build_and_register(ModTemplate::new("Sticky"))
            .unwrap();
        registry.enable_mod("Sticky").unwrap();
        registry.teardown();
    }

    let (mut registry, _) = registry(&dir);
    let m = registry
        .build_and_register(ModTemplate::new("Sticky"))
        .unwrap();
    assert!(m.is_enabled());
}

#[test]
fn test_unknown_mod_is_an_error() {
    let dir = TempDir::new().unwrap();
    let (mut registry, _) = registry(&dir);
    assert!(matches!(
        registry.enable_mod("ghost"),
        Err(RegistryError::UnknownMod(name)) if name == "ghost"
    ));
}

#[test]
fn test_console_line_resolves_aliases() {
    let dir = TempDir::new().unwrap();
    let (mut registry, _) = registry(&dir);
    let given = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&given);

    let give = Command::new("give", move |_, args| {
        let item = args.get_one::<String>("item").cloned().unwrap_or_default();
        let count = args.get_one::<u32>("count").copied().unwrap_or_default();
        sink.lock().push((item, count));
        Ok(())
    })
    .unwrap()
    .arg(Arg::new("item").required(true))
    .arg(
        Arg::new("count")
            .long("count")
            .value_parser(value_parser!(u32))
            .default_value("1"),
    )
    .alias("g")
    .unwrap();

    registry
        .build_and_register(ModTemplate::new("Spawner").command(give))
        .unwrap();

    // Commands of a disabled mod are not reachable
    assert!(matches!(
        registry.run_console_line("give pistol"),
        Err(CommandError::Unknown(_))
    ));

    registry.enable_mod("Spawner").unwrap();
    registry.run_console_line("give pistol").unwrap();
    registry
        .run_console_line("g \"rocket launcher\" --count 3")
        .unwrap();
    registry.run_console_line("   ").unwrap();

    assert_eq!(
        *given.lock(),
        vec![("pistol".to_string(), 1), ("rocket launcher".to_string(), 3)]
    );

    let err = registry.run_console_line("give").unwrap_err();
    match err {
        CommandError::Parse(e) => assert!(e.usage.contains("give")),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(given.lock().len(), 2);
}

#[test]
fn test_failing_command_reports_error() {
    let dir = TempDir::new().unwrap();
    let (mut registry, _) = registry(&dir);
    let broken = Command::new("explode", |_, _| anyhow::bail!("no explosives loaded")).unwrap();
    registry
        .build_and_register(ModTemplate::new("Broken").command(broken))
        .unwrap();
    registry.enable_mod("Broken").unwrap();

    match registry.run_console_line("explode") {
        Err(CommandError::Failed { command, source }) => {
            assert_eq!(command, "explode");
            assert_eq!(source.to_string(), "no explosives loaded");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_keybind_runs_command() {
    let dir = TempDir::new().unwrap();
    let (mut registry, _) = registry(&dir);
    let shouts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&shouts);

    let template = ModTemplate::new("Shouter")
        .command(
            Command::new("shout", move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap(),
        )
        .keybind(Keybind::new("shout_key", Some("F")).command("shout"));
    registry.build_and_register(template).unwrap();

    assert_eq!(registry.handle_key("F", InputEvent::Pressed), KeybindSignal::Continue);
    assert_eq!(shouts.load(Ordering::SeqCst), 0);

    registry.enable_mod("Shouter").unwrap();
    registry.handle_key("F", InputEvent::Pressed);
    registry.handle_key("F", InputEvent::Released);
    registry.handle_key("G", InputEvent::Pressed);
    assert_eq!(shouts.load(Ordering::SeqCst), 1);
}

#[test]
fn test_blocking_keybind_blocks_key() {
    let dir = TempDir::new().unwrap();
    let (mut registry, _) = registry(&dir);
    let template = ModTemplate::new("Greedy")
        .keybind(Keybind::new("eat", Some("E")).on_press(|_| KeybindSignal::Block));
    registry.build_and_register(template).unwrap();
    registry.enable_mod("Greedy").unwrap();

    assert_eq!(registry.handle_key("E", InputEvent::Pressed), KeybindSignal::Block);
    assert_eq!(registry.handle_key("Q", InputEvent::Pressed), KeybindSignal::Continue);
}

#[test]
fn test_deregister_stops_hooks() {
    let dir = TempDir::new().unwrap();
    let (mut registry, dispatcher) = registry(&dir);
    let m = registry
        .build_and_register(ModTemplate::new("Gone").hook(Hook::pre("h", "tick", |_, _| {
            HookSignal::Block
        })))
        .unwrap();
    registry.enable_mod("Gone").unwrap();
    assert_eq!(dispatcher.hook_count("tick"), 1);

    assert!(registry.deregister_mod(&m));
    assert_eq!(dispatcher.hook_count("tick"), 0);
    assert!(!m.is_enabled());
    assert!(registry.get("Gone").is_none());
}

#[test]
fn test_direct_registration_survives_reload_without_duplicate_hooks() {
    let dir = TempDir::new().unwrap();
    let (mut registry, dispatcher) = registry(&dir);

    let m = ModTemplate::new("Handmade")
        .hook(Hook::post("h", "tick", |_, _| HookSignal::Continue))
        .build(Some(dir.path()), registry.host_mut().hooks.as_mut())
        .unwrap();
    registry.register_mod(m.clone());
    registry.enable_mod("Handmade").unwrap();

    registry.reload();
    registry.reload();

    assert!(registry.get("Handmade").unwrap().ptr_eq(&m));
    assert!(m.is_enabled());
    assert_eq!(dispatcher.hook_count("tick"), 1);
}

#[test]
fn test_reregistering_same_mod_keeps_hooks() {
    let dir = TempDir::new().unwrap();
    let (mut registry, dispatcher) = registry(&dir);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let m = ModTemplate::new("Direct")
        .hook(Hook::pre("h", "ev", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            HookSignal::Continue
        }))
        .build(Some(dir.path()), registry.host_mut().hooks.as_mut())
        .unwrap();
    registry.register_mod(m.clone());
    registry.register_mod(m.clone());
    registry.enable_mod("Direct").unwrap();

    assert_eq!(registry.mods().len(), 1);
    assert_eq!(m.bound_hooks().len(), 1);
    assert_eq!(dispatcher.hook_count("ev"), 1);
    dispatcher.dispatch(&mut HookEvent::new("ev"), |_| {});
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
