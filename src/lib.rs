// Dream Recorder - core app runtime

pub mod analysis;
pub mod constants;
pub mod entry;
pub mod errors;
pub mod grouping;
pub mod recording;
pub mod state;
pub mod store;
pub mod view;

mod util;

#[cfg(feature = "desktop")]
use crate::analysis::provider::{
    analyze_or_fallback, illustrate_or_none, interpret_or_fallback, HostedAnalysisClient,
};
#[cfg(feature = "desktop")]
use crate::constants::{INTERPRETATION_FAILED, MANUAL_TRANSCRIPTION, TARGET_SAMPLE_RATE};
#[cfg(feature = "desktop")]
use crate::entry::{DreamEntry, EntryPatch, MediaPayload};
#[cfg(feature = "desktop")]
use crate::errors::{AppError, ErrorEvent};
#[cfg(feature = "desktop")]
use crate::grouping::ListOutcome;
#[cfg(feature = "desktop")]
use crate::recording::{AudioDevice, Recorder, WAV_MIME};
#[cfg(feature = "desktop")]
use crate::state::Settings;
#[cfg(feature = "desktop")]
use crate::store::{EntryStore, FileStorage};
#[cfg(feature = "desktop")]
use crate::view::{View, ViewState};
#[cfg(feature = "desktop")]
use std::collections::HashSet;
#[cfg(feature = "desktop")]
use std::path::PathBuf;
#[cfg(feature = "desktop")]
use std::sync::Mutex;
#[cfg(feature = "desktop")]
use std::thread;
#[cfg(feature = "desktop")]
use tauri::{AppHandle, Emitter, Manager, State};
#[cfg(feature = "desktop")]
use tracing::{error, info, warn};

#[cfg(feature = "desktop")]
pub(crate) struct AppState {
    store: Mutex<EntryStore<FileStorage>>,
    settings: Mutex<Settings>,
    view: Mutex<ViewState>,
    recorder: Mutex<Recorder>,
    illustrations_inflight: Mutex<HashSet<String>>,
    settings_path: PathBuf,
    config_dir: PathBuf,
}

#[cfg(feature = "desktop")]
pub(crate) fn emit_error(app: &AppHandle, error: AppError, context: Option<&str>) {
    let event = if let Some(ctx) = context {
        ErrorEvent::new(error.clone()).with_context(ctx)
    } else {
        ErrorEvent::new(error.clone())
    };

    error!("{}: {}", error.title(), error.message());

    let _ = app.emit("app:error", event);
}

#[cfg(feature = "desktop")]
fn emit_entries_updated(app: &AppHandle, state: &State<'_, AppState>) {
    let snapshot = state.store.lock().unwrap().entries().to_vec();
    let _ = app.emit("entries-updated", snapshot);
}

#[cfg(feature = "desktop")]
fn emit_view_changed(app: &AppHandle, state: &State<'_, AppState>) {
    let snapshot = state.view.lock().unwrap().clone();
    let _ = app.emit("view-changed", snapshot);
}

#[cfg(feature = "desktop")]
fn analysis_client(settings: &Settings, api_key: &str) -> HostedAnalysisClient {
    HostedAnalysisClient::new(
        &settings.endpoint,
        &settings.model,
        &settings.image_model,
        api_key,
    )
}

// ── Settings and API key ────────────────────────────────────────────────────

#[cfg(feature = "desktop")]
#[tauri::command]
fn get_settings(state: State<'_, AppState>) -> Settings {
    state.settings.lock().unwrap().clone()
}

#[cfg(feature = "desktop")]
#[tauri::command]
fn save_settings(
    app: AppHandle,
    state: State<'_, AppState>,
    mut settings: Settings,
) -> Result<(), String> {
    settings.normalize();
    state::save_settings_file(&state.settings_path, &settings)?;
    *state.settings.lock().unwrap() = settings.clone();
    let _ = app.emit("settings-changed", settings);
    Ok(())
}

#[cfg(feature = "desktop")]
#[tauri::command]
fn set_api_key(state: State<'_, AppState>, key: String) -> Result<(), String> {
    analysis::keyring::store_api_key(&state.config_dir, &key)
}

#[cfg(feature = "desktop")]
#[tauri::command]
fn clear_api_key(state: State<'_, AppState>) -> Result<(), String> {
    analysis::keyring::clear_api_key(&state.config_dir)
}

#[cfg(feature = "desktop")]
#[tauri::command]
fn has_api_key(state: State<'_, AppState>) -> bool {
    matches!(
        analysis::keyring::read_api_key(&state.config_dir),
        Ok(Some(_))
    )
}

#[cfg(feature = "desktop")]
#[tauri::command]
fn list_audio_devices() -> Vec<AudioDevice> {
    recording::list_audio_devices()
}

// ── Journal ─────────────────────────────────────────────────────────────────

#[cfg(feature = "desktop")]
#[tauri::command]
fn get_entries(state: State<'_, AppState>) -> Vec<DreamEntry> {
    state.store.lock().unwrap().entries().to_vec()
}

#[cfg(feature = "desktop")]
#[tauri::command]
fn get_dream_feed(state: State<'_, AppState>, query: Option<String>) -> ListOutcome {
    let store = state.store.lock().unwrap();
    grouping::build_feed(store.entries(), query.as_deref().unwrap_or(""))
}

#[cfg(feature = "desktop")]
#[tauri::command]
fn create_manual_entry(
    app: AppHandle,
    state: State<'_, AppState>,
    text: String,
) -> Result<String, String> {
    let entry = DreamEntry::manual(&text);
    let id = entry.id.clone();
    state.store.lock().unwrap().insert(entry)?;
    emit_entries_updated(&app, &state);
    Ok(id)
}

#[cfg(feature = "desktop")]
#[tauri::command]
fn update_transcription(
    app: AppHandle,
    state: State<'_, AppState>,
    id: String,
    text: String,
) -> Result<(), String> {
    let patch = EntryPatch {
        transcription: Some(text),
        ..EntryPatch::default()
    };
    state.store.lock().unwrap().update_by_id(&id, &patch)?;
    emit_entries_updated(&app, &state);
    Ok(())
}

#[cfg(feature = "desktop")]
#[tauri::command]
fn add_tag(
    app: AppHandle,
    state: State<'_, AppState>,
    id: String,
    tag: String,
) -> Result<(), String> {
    let tags = {
        let store = state.store.lock().unwrap();
        store.get(&id).map(|entry| {
            let mut updated = entry.clone();
            updated.add_tag(&tag);
            updated.tags
        })
    };
    if let Some(tags) = tags {
        let patch = EntryPatch {
            tags: Some(tags),
            ..EntryPatch::default()
        };
        state.store.lock().unwrap().update_by_id(&id, &patch)?;
        emit_entries_updated(&app, &state);
    }
    Ok(())
}

#[cfg(feature = "desktop")]
#[tauri::command]
fn remove_tag(
    app: AppHandle,
    state: State<'_, AppState>,
    id: String,
    tag: String,
) -> Result<(), String> {
    let tags = {
        let store = state.store.lock().unwrap();
        store.get(&id).map(|entry| {
            let mut updated = entry.clone();
            updated.remove_tag(&tag);
            updated.tags
        })
    };
    if let Some(tags) = tags {
        let patch = EntryPatch {
            tags: Some(tags),
            ..EntryPatch::default()
        };
        state.store.lock().unwrap().update_by_id(&id, &patch)?;
        emit_entries_updated(&app, &state);
    }
    Ok(())
}

#[cfg(feature = "desktop")]
#[tauri::command]
fn clear_all_entries(app: AppHandle, state: State<'_, AppState>) -> Result<(), String> {
    state.store.lock().unwrap().clear()?;
    // Selected ids would dangle after a wipe.
    state.view.lock().unwrap().retain_selection(|_| false);
    emit_entries_updated(&app, &state);
    emit_view_changed(&app, &state);
    Ok(())
}

// ── Recording ───────────────────────────────────────────────────────────────

#[cfg(feature = "desktop")]
#[tauri::command]
fn start_recording(app: AppHandle, state: State<'_, AppState>) -> Result<(), String> {
    let device = state.settings.lock().unwrap().input_device.clone();
    if let Err(err) = state.recorder.lock().unwrap().start(&device) {
        emit_error(
            &app,
            AppError::AudioDevice(err.clone()),
            Some("Starting recording"),
        );
        return Err(err);
    }
    let _ = app.emit("capture:state", "recording");
    Ok(())
}

#[cfg(feature = "desktop")]
#[tauri::command]
fn stop_recording(app: AppHandle, state: State<'_, AppState>) -> Result<String, String> {
    let samples = state.recorder.lock().unwrap().stop()?;
    let _ = app.emit("capture:state", "idle");

    if samples.is_empty() {
        let err = "Nothing was captured".to_string();
        emit_error(
            &app,
            AppError::AudioDevice(err.clone()),
            Some("Stopping recording"),
        );
        return Err(err);
    }

    let wav = recording::encode_wav(&samples, TARGET_SAMPLE_RATE)?;
    let entry = DreamEntry::recorded(MediaPayload::from_bytes(&wav, WAV_MIME));
    let id = entry.id.clone();

    // Optimistic insert: the pending entry is on screen before the analysis
    // call even starts.
    state.store.lock().unwrap().insert(entry)?;
    state.view.lock().unwrap().finish_recording();
    emit_entries_updated(&app, &state);
    emit_view_changed(&app, &state);

    spawn_analysis(app, id.clone(), wav);
    Ok(id)
}

/// Background analysis for one freshly recorded entry. Navigation does not
/// cancel it; whenever it resolves, the entry is patched in place and the
/// pending flag cleared. Without an API key the entry is released to manual
/// transcription instead.
#[cfg(feature = "desktop")]
fn spawn_analysis(app: AppHandle, entry_id: String, audio: Vec<u8>) {
    thread::spawn(move || {
        let state = app.state::<AppState>();
        let settings = state.settings.lock().unwrap().clone();

        let api_key = match analysis::keyring::read_api_key(&state.config_dir) {
            Ok(key) => key,
            Err(err) => {
                warn!("Could not read the API key: {}", err);
                None
            }
        };

        let patch = match api_key {
            Some(key) => {
                let client = analysis_client(&settings, &key);
                let analysis = analyze_or_fallback(&client, &audio, WAV_MIME);
                EntryPatch {
                    transcription: Some(analysis.transcription),
                    tags: Some(analysis.tags),
                    mood: Some(analysis.mood),
                    lucidity_score: Some(analysis.lucidity_score),
                    pending: Some(false),
                    ..EntryPatch::default()
                }
            }
            None => {
                info!("No API key configured; releasing entry for manual transcription");
                EntryPatch {
                    transcription: Some(MANUAL_TRANSCRIPTION.to_string()),
                    pending: Some(false),
                    ..EntryPatch::default()
                }
            }
        };

        match state.store.lock().unwrap().update_by_id(&entry_id, &patch) {
            Ok(_) => {}
            Err(err) => {
                emit_error(&app, AppError::Storage(err), Some("Saving dream analysis"));
                return;
            }
        }
        emit_entries_updated(&app, &state);
    });
}

// ── Illustration ────────────────────────────────────────────────────────────

#[cfg(feature = "desktop")]
#[tauri::command]
fn request_illustration(
    app: AppHandle,
    state: State<'_, AppState>,
    id: String,
) -> Result<(), String> {
    {
        let store = state.store.lock().unwrap();
        let Some(entry) = store.get(&id) else {
            return Err("Unknown dream entry".to_string());
        };
        if entry.pending {
            return Err("This dream is still being transcribed".to_string());
        }
    }

    // One illustration request per entry at a time.
    if !state.illustrations_inflight.lock().unwrap().insert(id.clone()) {
        return Err("An illustration for this dream is already on its way".to_string());
    }

    thread::spawn(move || {
        let state = app.state::<AppState>();
        let settings = state.settings.lock().unwrap().clone();

        let source = {
            let store = state.store.lock().unwrap();
            store
                .get(&id)
                .map(|entry| (entry.transcription.clone(), entry.mood.clone()))
        };

        let image = source.and_then(|(transcription, mood)| {
            match analysis::keyring::read_api_key(&state.config_dir) {
                Ok(Some(key)) => {
                    let client = analysis_client(&settings, &key);
                    illustrate_or_none(&client, &transcription, &mood)
                }
                _ => None,
            }
        });

        match image {
            Some(bytes) => {
                let patch = EntryPatch {
                    illustration: Some(MediaPayload::from_bytes(&bytes, "image/png")),
                    ..EntryPatch::default()
                };
                match state.store.lock().unwrap().update_by_id(&id, &patch) {
                    Ok(_) => emit_entries_updated(&app, &state),
                    Err(err) => {
                        emit_error(&app, AppError::Storage(err), Some("Saving illustration"))
                    }
                }
            }
            None => {
                // Absence is the failure signal; the entry stays untouched.
                let _ = app.emit("illustration-failed", id.clone());
                emit_error(
                    &app,
                    AppError::Analysis("The illustration could not be generated".to_string()),
                    Some("Illustration"),
                );
            }
        }

        state.illustrations_inflight.lock().unwrap().remove(&id);
    });

    Ok(())
}

// ── Views and interpretation ────────────────────────────────────────────────

#[cfg(feature = "desktop")]
#[tauri::command]
fn get_view_state(state: State<'_, AppState>) -> ViewState {
    state.view.lock().unwrap().clone()
}

#[cfg(feature = "desktop")]
#[tauri::command]
fn set_view(app: AppHandle, state: State<'_, AppState>, view: View) {
    state.view.lock().unwrap().set_view(view);
    emit_view_changed(&app, &state);
}

#[cfg(feature = "desktop")]
#[tauri::command]
fn toggle_interpretation_selection(
    app: AppHandle,
    state: State<'_, AppState>,
    id: String,
) -> Vec<String> {
    let selection = {
        let mut view = state.view.lock().unwrap();
        view.toggle_selection(&id);
        view.selection().to_vec()
    };
    emit_view_changed(&app, &state);
    selection
}

#[cfg(feature = "desktop")]
#[tauri::command]
fn request_interpretation(app: AppHandle, state: State<'_, AppState>) -> Result<(), String> {
    let selected_ids = {
        let mut view = state.view.lock().unwrap();
        view.begin_interpretation()?;
        view.selection().to_vec()
    };

    let entries: Vec<DreamEntry> = {
        let limit = state.settings.lock().unwrap().interpretation_entry_limit as usize;
        let store = state.store.lock().unwrap();
        store
            .entries()
            .iter()
            .filter(|entry| selected_ids.contains(&entry.id))
            .take(limit)
            .cloned()
            .collect()
    };

    emit_view_changed(&app, &state);

    thread::spawn(move || {
        let state = app.state::<AppState>();
        let settings = state.settings.lock().unwrap().clone();

        let text = match analysis::keyring::read_api_key(&state.config_dir) {
            Ok(Some(key)) => {
                let client = analysis_client(&settings, &key);
                interpret_or_fallback(&client, &entries)
            }
            _ => {
                warn!("Interpretation requested without an API key");
                INTERPRETATION_FAILED.to_string()
            }
        };

        let snapshot = {
            let mut view = state.view.lock().unwrap();
            view.finish_interpretation(text);
            view.clone()
        };
        let _ = app.emit("interpretation-updated", snapshot);
    });

    Ok(())
}

#[cfg(feature = "desktop")]
#[tauri::command]
fn clear_interpretation(app: AppHandle, state: State<'_, AppState>) {
    state.view.lock().unwrap().clear_interpretation();
    emit_view_changed(&app, &state);
}

// ── Runtime ─────────────────────────────────────────────────────────────────

#[cfg(feature = "desktop")]
fn init_logging() -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_subscriber::fmt::writer::MakeWriterExt;
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let log_dir = state::default_data_dir().join("logs");
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(log_dir, "dream-recorder.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stdout.and(file_writer))
        .init();

    guard
}

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let _log_guard = init_logging();
    info!("Starting Dream Recorder");

    tauri::Builder::default()
        .setup(|app| {
            let config_dir = state::default_config_dir();
            let settings_path = config_dir.join(state::SETTINGS_FILE);
            let settings = state::load_settings(&settings_path);

            let journal_path = state::default_data_dir().join(state::JOURNAL_FILE);
            let store = EntryStore::load(FileStorage::new(journal_path));
            info!("Journal loaded with {} entries", store.entries().len());

            app.manage(AppState {
                store: Mutex::new(store),
                settings: Mutex::new(settings),
                view: Mutex::new(ViewState::new()),
                recorder: Mutex::new(Recorder::new()),
                illustrations_inflight: Mutex::new(HashSet::new()),
                settings_path,
                config_dir,
            });

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            get_settings,
            save_settings,
            set_api_key,
            clear_api_key,
            has_api_key,
            list_audio_devices,
            get_entries,
            get_dream_feed,
            create_manual_entry,
            update_transcription,
            add_tag,
            remove_tag,
            clear_all_entries,
            start_recording,
            stop_recording,
            request_illustration,
            get_view_state,
            set_view,
            toggle_interpretation_selection,
            request_interpretation,
            clear_interpretation,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}

#[cfg(not(feature = "desktop"))]
pub fn run() {}
