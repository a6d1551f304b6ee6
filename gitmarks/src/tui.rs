//! Terminal lifecycle.
//!
//! The UI owns stdout for the whole session: raw mode, the alternate screen,
//! mouse capture and focus reporting are switched on together in
//! [`init_tui`] and off together in [`restore_tui`]. Logging goes to a file
//! for the same reason, since anything printed to the terminal while the
//! alternate screen is up corrupts the frame.
//!
//! ratatui does not restore the terminal on drop, so [`restore_tui`] runs at
//! every exit path of `main`, and the panic hook calls it as well.

use crossterm::event::{DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use signal_hook::consts::SIGTERM;
use signal_hook::flag::register;
use std::io::{stdout, BufWriter, Stdout};
use std::panic;
use std::sync::{atomic::AtomicBool, Arc};

/// Crossterm backend over buffered stdout.
///
/// `BufWriter` batches the escape sequences of one draw into a few writes,
/// which keeps a 30 FPS redraw from flickering.
pub type Tui = Terminal<CrosstermBackend<BufWriter<Stdout>>>;

/// Enables raw mode, enters the alternate screen and turns on mouse and
/// focus reporting. Pair every call with [`restore_tui`].
///
/// # Errors
///
/// Returns `Err` if `enable_raw_mode`, `execute!` or `Terminal::new` fails.
/// The terminal may then be half-initialised; callers should still run
/// [`restore_tui`].
pub fn init_tui() -> std::io::Result<Tui> {
    let mut out = BufWriter::new(stdout());
    enable_raw_mode()?;
    execute!(out, EnterAlternateScreen, EnableMouseCapture, EnableFocusChange)?;
    Terminal::new(CrosstermBackend::new(out))
}

/// Leaves the alternate screen, stops mouse and focus reporting and disables
/// raw mode.
///
/// Idempotent, so the panic hook can call it after `main` already has.
///
/// # Errors
///
/// Returns `Err` if `disable_raw_mode` or `execute!` fails. The panic hook
/// ignores the error; there is nothing left to fall back to.
pub fn restore_tui() -> std::io::Result<()> {
    disable_raw_mode()?;
    execute!(stdout(), LeaveAlternateScreen, DisableMouseCapture, DisableFocusChange)?;
    Ok(())
}

/// Chains a panic hook that restores the terminal and logs the panic, then
/// runs the previously installed hook.
///
/// Install before [`init_tui`]. Without it a panic leaves the shell in raw
/// mode on the alternate screen with the message hidden.
pub fn install_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_tui();
        tracing::error!(%panic_info, "panic");
        original_hook(panic_info);
    }));
}

/// Returns a flag that flips to `true` when the process receives SIGTERM.
///
/// The handler only performs an atomic store. The main loop polls the flag
/// on its 50 ms heartbeat and after every event, then exits through the
/// normal restore path.
///
/// # Errors
///
/// Returns `Err` if the OS refuses to register the handler.
pub fn register_sigterm() -> std::io::Result<Arc<AtomicBool>> {
    let term = Arc::new(AtomicBool::new(false));
    register(SIGTERM, Arc::clone(&term))?;
    Ok(term)
}
