mod dialogs;
mod gpu;

use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use log::{error, info};
use winit::{
    dpi::{LogicalSize, PhysicalSize},
    event::*,
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, ModifiersState, PhysicalKey},
    window::{CursorIcon, Window, WindowAttributes},
};

use flipbook::{report, CursorShape, Direction, DocumentEvent, Editor, EditorConfig, Tool};

use crate::gpu::Gpu;

const USAGE: &str = "usage: flipbook [--config <file>] [document.anim]";

struct Args {
    config: Option<PathBuf>,
    document: Option<PathBuf>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        config: None,
        document: None,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => {
                let path = it.next().ok_or_else(|| "--config needs a file".to_string())?;
                args.config = Some(PathBuf::from(path));
            }
            "-h" | "--help" => return Err(USAGE.to_string()),
            _ if args.document.is_none() => args.document = Some(PathBuf::from(arg)),
            _ => return Err(format!("unexpected argument '{arg}'\n{USAGE}")),
        }
    }
    Ok(args)
}

fn cursor_icon(shape: CursorShape) -> CursorIcon {
    match shape {
        CursorShape::Arrow => CursorIcon::Default,
        CursorShape::SizeVertical => CursorIcon::NsResize,
        CursorShape::SizeHorizontal => CursorIcon::EwResize,
        CursorShape::SizeFDiagonal => CursorIcon::NwseResize,
        CursorShape::SizeBDiagonal => CursorIcon::NeswResize,
    }
}

fn center_view(editor: &mut Editor, size: PhysicalSize<u32>) {
    let (w, h) = (editor.document().width(), editor.document().height());
    editor.view.center(w, h, size.width, size.height);
}

fn redraw(editor: &Editor, gpu: &mut Gpu, size: PhysicalSize<u32>) -> Result<(), wgpu::SurfaceError> {
    let frame = editor
        .render_current_frame()
        .and_then(|f| {
            editor
                .view
                .present(&f, editor.document().background, size.width, size.height)
        });
    match frame {
        Ok(presented) => gpu.render(&presented),
        Err(e) => {
            error!("render failed: {e}");
            Ok(())
        }
    }
}

fn save(editor: &Editor, path: &mut Option<PathBuf>) {
    let target = match path.clone() {
        Some(p) => p,
        None => match dialogs::select_save_document_path() {
            Ok(p) => p,
            Err(msg) => {
                info!("{msg}");
                return;
            }
        },
    };
    if report(editor.save(&target)).is_some() {
        *path = Some(target);
    }
}

/// Keyboard shortcuts; returns true when the view needs repainting.
fn handle_key(
    editor: &mut Editor,
    code: KeyCode,
    ctrl: bool,
    document_path: &mut Option<PathBuf>,
) -> bool {
    match code {
        KeyCode::Space => {
            editor.toggle_playback();
        }
        KeyCode::ArrowLeft => {
            report(editor.previous_frame());
        }
        KeyCode::ArrowRight => {
            report(editor.next_frame());
        }
        KeyCode::Digit1 => editor.set_tool(Tool::Pencil),
        KeyCode::Digit2 => editor.set_tool(Tool::Eraser),
        KeyCode::Digit3 => editor.set_tool(Tool::Bucket),
        KeyCode::Digit4 => editor.set_tool(Tool::Selection),
        KeyCode::KeyO if ctrl => match dialogs::select_document() {
            Ok(path) => {
                if report(editor.open(&path)).is_some() {
                    *document_path = Some(path);
                } else {
                    *document_path = None;
                }
            }
            Err(msg) => info!("{msg}"),
        },
        KeyCode::KeyO => {
            editor.toggle_onion_skin();
        }
        KeyCode::Equal | KeyCode::NumpadAdd => {
            info!("pen size {}", editor.increase_pen_size());
        }
        KeyCode::Minus | KeyCode::NumpadSubtract => {
            info!("pen size {}", editor.decrease_pen_size());
        }
        KeyCode::KeyA => {
            let enabled = !editor.anti_aliasing().enabled;
            editor.set_anti_aliasing(enabled);
        }
        KeyCode::KeyQ => {
            let quality = editor.anti_aliasing().quality() % 3 + 1;
            editor.set_anti_aliasing_quality(quality);
        }
        KeyCode::KeyZ if ctrl => {
            report(editor.undo());
        }
        KeyCode::KeyY if ctrl => {
            report(editor.redo());
        }
        KeyCode::KeyC if ctrl => {
            report(editor.copy_frame());
        }
        KeyCode::KeyV if ctrl => {
            report(editor.paste_frame());
        }
        KeyCode::KeyS if ctrl => save(editor, document_path),
        KeyCode::F5 => {
            report(editor.duplicate_frame());
        }
        KeyCode::KeyN => {
            report(editor.add_frame());
        }
        KeyCode::Delete => {
            report(editor.delete_frame());
        }
        KeyCode::KeyL => {
            report(editor.add_layer());
        }
        KeyCode::PageUp => {
            report(editor.move_layer(Direction::Up));
        }
        KeyCode::PageDown => {
            report(editor.move_layer(Direction::Down));
        }
        KeyCode::KeyI => match dialogs::select_image_file() {
            Ok(path) => {
                report(editor.import_image(path));
            }
            Err(msg) => info!("{msg}"),
        },
        KeyCode::KeyE => match dialogs::select_export_folder() {
            Ok(dir) => {
                report(editor.export_frames(dir));
            }
            Err(msg) => info!("{msg}"),
        },
        KeyCode::KeyV => match dialogs::select_video_path() {
            Ok(out) => {
                report(editor.export_video(out));
            }
            Err(msg) => info!("{msg}"),
        },
        _ => return false,
    }
    true
}

fn main() {
    env_logger::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
    };
    let config = match &args.config {
        Some(path) => EditorConfig::load(path).unwrap_or_else(|e| {
            error!("{e}; using defaults");
            EditorConfig::default()
        }),
        None => EditorConfig::default(),
    };
    let mut editor = match Editor::new(config) {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    let mut document_path = None;
    if let Some(path) = args.document {
        if report(editor.open(&path)).is_some() {
            document_path = Some(path);
        }
    }

    let recenter = Rc::new(Cell::new(true));
    let flag = Rc::clone(&recenter);
    editor.subscribe(move |event| {
        if matches!(
            event,
            DocumentEvent::DocumentReplaced | DocumentEvent::CanvasResized { .. }
        ) {
            flag.set(true);
        }
    });

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            eprintln!("cannot start event loop: {e}");
            std::process::exit(1);
        }
    };
    let mut gpu: Option<Gpu> = None;
    let mut window_size: PhysicalSize<u32> = PhysicalSize::new(0, 0);
    let mut window: Option<Arc<Window>> = None;
    let mut modifiers = ModifiersState::empty();
    let mut cursor = (0.0f32, 0.0f32);
    let mut pressed = false;
    let mut last_tick = Instant::now();

    let result = event_loop.run(move |event, elwt| match event {
        Event::Resumed => {
            if gpu.is_none() {
                let attrs = WindowAttributes::default()
                    .with_title("Flipbook")
                    .with_inner_size(LogicalSize::new(1024.0, 768.0));
                let w = match elwt.create_window(attrs) {
                    Ok(w) => Arc::new(w),
                    Err(e) => {
                        error!("cannot create window: {e}");
                        elwt.exit();
                        return;
                    }
                };
                match pollster::block_on(Gpu::new(&w)) {
                    Ok((g, s)) => {
                        window_size = s;
                        gpu = Some(g);
                        window = Some(w);
                    }
                    Err(msg) => {
                        error!("{msg}");
                        elwt.exit();
                    }
                }
            }
        }

        Event::WindowEvent { event, window_id } => {
            let (Some(g), Some(w)) = (gpu.as_mut(), window.as_ref()) else {
                return;
            };
            if window_id != w.id() {
                return;
            }
            match event {
                WindowEvent::CloseRequested => elwt.exit(),
                WindowEvent::Resized(new_size) => {
                    window_size = new_size;
                    g.resize(new_size);
                    w.request_redraw();
                }
                WindowEvent::ModifiersChanged(m) => modifiers = m.state(),
                WindowEvent::KeyboardInput { event, .. } => {
                    if event.state == ElementState::Pressed && !event.repeat {
                        if let PhysicalKey::Code(code) = event.physical_key {
                            let ctrl = modifiers.control_key() || modifiers.super_key();
                            if handle_key(&mut editor, code, ctrl, &mut document_path) {
                                w.request_redraw();
                            }
                        }
                    }
                }
                WindowEvent::MouseInput {
                    state,
                    button: MouseButton::Left,
                    ..
                } => {
                    if state == ElementState::Pressed {
                        pressed = true;
                        report(editor.pointer_down(cursor));
                    } else if pressed {
                        pressed = false;
                        report(editor.pointer_up(cursor));
                    }
                    w.request_redraw();
                }
                WindowEvent::CursorMoved { position, .. } => {
                    cursor = (position.x as f32, position.y as f32);
                    if pressed {
                        report(editor.pointer_move(cursor));
                        w.request_redraw();
                    }
                    w.set_cursor(cursor_icon(editor.cursor_at(cursor)));
                }
                WindowEvent::MouseWheel { delta, .. } => {
                    let (dx, dy) = match delta {
                        MouseScrollDelta::LineDelta(x, y) => (x, y),
                        MouseScrollDelta::PixelDelta(p) => (p.x as f32 / 40.0, p.y as f32 / 40.0),
                    };
                    if modifiers.control_key() {
                        if dy != 0.0 {
                            editor.view.zoom_at(cursor, dy > 0.0);
                        }
                    } else if modifiers.shift_key() {
                        editor.view.pan_horizontal(dy);
                    } else {
                        editor.view.pan_horizontal(dx);
                        editor.view.pan_vertical(dy);
                    }
                    w.request_redraw();
                }
                WindowEvent::RedrawRequested => {
                    if recenter.replace(false) {
                        center_view(&mut editor, window_size);
                    }
                    if let Err(e) = redraw(&editor, g, window_size) {
                        match e {
                            wgpu::SurfaceError::Lost => {
                                g.resize(window_size);
                                w.request_redraw();
                            }
                            wgpu::SurfaceError::OutOfMemory => elwt.exit(),
                            other => error!("{other:?}"),
                        }
                    }
                }
                _ => {}
            }
        }

        Event::AboutToWait => {
            let now = Instant::now();
            if editor.tick(now - last_tick).is_some() {
                if let Some(w) = window.as_ref() {
                    w.request_redraw();
                }
            }
            last_tick = now;
            if editor.playback.is_playing() {
                elwt.set_control_flow(ControlFlow::WaitUntil(now + editor.playback.interval()));
            } else {
                elwt.set_control_flow(ControlFlow::Wait);
            }
        }

        _ => {}
    });

    if let Err(e) = result {
        error!("event loop stopped: {e}");
    }
}
