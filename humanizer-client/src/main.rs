#![cfg_attr(target_os = "windows", windows_subsystem = "windows")]

use std::{
    sync::mpsc as std_mpsc,
    time::{Duration, Instant},
};

use clap::Parser;
use eframe::egui;
use humanizer_client::{
    api::RelayApi,
    controller::{
        COMPLETE_DISPLAY_DELAY, Controller, ProcessorEvent, STAGE_SCHEDULE, Stage,
    },
    files::{ExportFormat, FileStore, export_text},
};
use humanizer_core::{
    HumanizeResult, MAX_TOKENS_MAX, MAX_TOKENS_MIN, SamplingParams, TEMPERATURE_MAX,
    TEMPERATURE_MIN, TOP_P_MAX, TOP_P_MIN, Tone,
};
use tokio::{runtime::Runtime, sync::mpsc};
use tracing::{debug, warn};

#[derive(Parser, Debug)]
#[command(name = "humanizer")]
struct ClientArgs {
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    relay_url: String,
}

#[derive(Debug)]
enum RuntimeCommand {
    Humanize(humanizer_core::HumanizeRequest),
}

fn main() -> eframe::Result {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = ClientArgs::parse();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([900.0, 640.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Humanizer",
        options,
        Box::new(move |_cc| {
            HumanizerApp::new(&args)
                .map(|app| Box::new(app) as Box<dyn eframe::App>)
                .map_err(Into::into)
        }),
    )
}

struct HumanizerApp {
    _runtime: Runtime,
    event_rx: std_mpsc::Receiver<ProcessorEvent>,
    command_tx: mpsc::UnboundedSender<RuntimeCommand>,
    controller: Controller,
    input: String,
    tone: Tone,
    params: SamplingParams,
    file_store: FileStore,
    last_error: Option<String>,
}

impl HumanizerApp {
    fn new(args: &ClientArgs) -> Result<Self, String> {
        let runtime = Runtime::new().map_err(|err| format!("tokio runtime init failed: {err}"))?;
        let (event_tx, event_rx) = std_mpsc::channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let api = RelayApi::new(&args.relay_url);
        runtime.spawn(run_processor(api, command_rx, event_tx));

        Ok(Self {
            _runtime: runtime,
            event_rx,
            command_tx,
            controller: Controller::new(),
            input: String::new(),
            tone: Tone::default(),
            params: SamplingParams::default(),
            file_store: FileStore::new(),
            last_error: None,
        })
    }

    fn submit(&mut self) {
        match self
            .controller
            .begin_submission(&self.input, self.tone, self.params)
        {
            Ok(request) => {
                let original = request.text.clone();
                if self
                    .command_tx
                    .send(RuntimeCommand::Humanize(request))
                    .is_err()
                {
                    self.controller.apply_event(ProcessorEvent::Failed {
                        original,
                        message: "the background task stopped".to_owned(),
                    });
                }
            }
            Err(err) => debug!("submission rejected: {}", err),
        }
    }

    fn copy_output(&mut self) {
        let text = self.controller.humanized_text().to_owned();
        match arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text)) {
            Ok(()) => {
                self.controller.mark_copied(Instant::now());
                self.last_error = None;
            }
            Err(err) => self.last_error = Some(format!("clipboard copy failed: {err}")),
        }
    }

    fn export_output(&mut self, format: ExportFormat) {
        let picked = rfd::FileDialog::new()
            .set_file_name(format!("humanized.{}", format.extension()))
            .add_filter("Text", &[format.extension()])
            .save_file();
        let Some(path) = picked else {
            return;
        };
        match export_text(&path, self.controller.humanized_text()) {
            Ok(()) => self.last_error = None,
            Err(err) => self.last_error = Some(format!("export failed: {err}")),
        }
    }

    fn attach_file(&mut self) {
        let picked = rfd::FileDialog::new()
            .add_filter("Text files", &["txt", "md"])
            .pick_file();
        let Some(path) = picked else {
            return;
        };
        match self.file_store.attach(&path) {
            Ok(_) => self.last_error = None,
            Err(err) => self.last_error = Some(format!("attach failed: {err}")),
        }
    }

    fn settings_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Settings");
        ui.add_space(8.0);

        egui::ComboBox::from_label("Tone")
            .selected_text(self.tone.label())
            .show_ui(ui, |ui| {
                for tone in Tone::ALL {
                    ui.selectable_value(&mut self.tone, tone, tone.label());
                }
            });

        ui.add_space(8.0);
        ui.add(
            egui::Slider::new(&mut self.params.temperature, TEMPERATURE_MIN..=TEMPERATURE_MAX)
                .text("Temperature"),
        );
        ui.add(egui::Slider::new(&mut self.params.top_p, TOP_P_MIN..=TOP_P_MAX).text("Top-p"));
        ui.add(
            egui::Slider::new(&mut self.params.max_tokens, MAX_TOKENS_MIN..=MAX_TOKENS_MAX)
                .text("Max tokens"),
        );

        ui.add_space(16.0);
        ui.heading("Files");
        ui.add_space(8.0);
        if ui.button("Attach file...").clicked() {
            self.attach_file();
        }

        let mut use_content: Option<String> = None;
        let mut remove_id: Option<u64> = None;
        for file in self.file_store.files() {
            ui.horizontal(|ui| {
                ui.label(&file.name);
                if ui.small_button("Use").clicked() {
                    use_content = Some(file.content.clone());
                }
                if ui.small_button("Remove").clicked() {
                    remove_id = Some(file.id);
                }
            });
        }
        if let Some(content) = use_content {
            self.input = content;
        }
        if let Some(id) = remove_id {
            self.file_store.remove(id);
        }
    }

    fn editor_panel(&mut self, ui: &mut egui::Ui) {
        let processing = self.controller.processing();

        ui.heading("Humanizer");
        ui.add_space(8.0);
        ui.add_enabled(
            !processing.is_processing,
            egui::TextEdit::multiline(&mut self.input)
                .hint_text("Paste the text to humanize...")
                .desired_rows(8)
                .desired_width(f32::INFINITY),
        );

        ui.add_space(8.0);
        if ui
            .add_enabled(
                self.controller.can_submit(&self.input),
                egui::Button::new("Humanize"),
            )
            .clicked()
        {
            self.submit();
        }

        if processing.is_processing {
            ui.add_space(8.0);
            ui.add(
                egui::ProgressBar::new(f32::from(processing.progress) / 100.0)
                    .text(format!("{}...", processing.stage.label())),
            );
        }

        ui.add_space(12.0);
        ui.separator();
        ui.add_space(8.0);

        let output = self.controller.humanized_text().to_owned();
        ui.add(
            egui::TextEdit::multiline(&mut output.as_str())
                .desired_rows(8)
                .desired_width(f32::INFINITY),
        );

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            let has_output = !output.is_empty();
            if ui
                .add_enabled(has_output, egui::Button::new("Copy"))
                .clicked()
            {
                self.copy_output();
            }
            if self.controller.copied(Instant::now()) {
                ui.label("Copied!");
            }
            if ui
                .add_enabled(has_output, egui::Button::new("Export .txt"))
                .clicked()
            {
                self.export_output(ExportFormat::Txt);
            }
            if ui
                .add_enabled(has_output, egui::Button::new("Export .md"))
                .clicked()
            {
                self.export_output(ExportFormat::Md);
            }
        });

        if let Some(error) = &self.last_error {
            ui.add_space(8.0);
            ui.colored_label(egui::Color32::LIGHT_RED, error);
        }
    }
}

impl eframe::App for HumanizerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        while let Ok(event) = self.event_rx.try_recv() {
            self.controller.apply_event(event);
        }

        if self.controller.processing().is_processing || self.controller.copied(Instant::now()) {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        egui::SidePanel::left("settings")
            .default_width(260.0)
            .show(ctx, |ui| self.settings_panel(ui));
        egui::CentralPanel::default().show(ctx, |ui| self.editor_panel(ui));
    }
}

/// Background request loop. Commands arrive from the UI thread; each one
/// walks the cosmetic stage schedule, then makes the single relay call and
/// reports the outcome. There is no cancellation path.
async fn run_processor(
    api: RelayApi,
    mut command_rx: mpsc::UnboundedReceiver<RuntimeCommand>,
    event_tx: std_mpsc::Sender<ProcessorEvent>,
) {
    while let Some(RuntimeCommand::Humanize(request)) = command_rx.recv().await {
        for (stage, delay, progress) in STAGE_SCHEDULE {
            let _ = event_tx.send(ProcessorEvent::StageAdvanced { stage, progress });
            tokio::time::sleep(delay).await;
        }

        match api.humanize(&request).await {
            Ok(humanized) => {
                let _ = event_tx.send(ProcessorEvent::StageAdvanced {
                    stage: Stage::Complete,
                    progress: 100,
                });
                tokio::time::sleep(COMPLETE_DISPLAY_DELAY).await;
                let _ = event_tx.send(ProcessorEvent::Completed(HumanizeResult::success(
                    request.text.clone(),
                    humanized,
                )));
            }
            Err(err) => {
                warn!("humanize request failed: {}", err);
                let _ = event_tx.send(ProcessorEvent::Failed {
                    original: request.text,
                    message: err.to_string(),
                });
            }
        }
    }
}
