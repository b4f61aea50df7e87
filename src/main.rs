use std::io;

use glyph_console::{cprint, Color, Console};
use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

fn main() -> io::Result<()> {
    TermLogger::init(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .expect("logger init");

    let console = Console::init("Dungeon", 80, 25, "assets/VGA8x16.png", 8, 16)?;
    let code = console.start(game_main)?;
    std::process::exit(code);
}

fn game_main(con: glyph_console::ConsoleHandle) -> i32 {
    con.set_cursor(0, 0);
    for _ in 0..15 {
        con.print(Color::WHITE, Color::BLACK, ".");
    }
    con.print(Color::WHITE, Color::BLACK, "\nWelcome!\n");

    con.sleep(500);
    con.print(Color::WHITE, Color::BLACK, "Press all the keys!\n");

    let mut code: u8 = 0;
    while !con.should_quit() {
        let key = match con.wait_key() {
            Some(key) => key,
            None => break,
        };
        con.set(5, 5, code as u32, Color::BLACK, Color::WHITE);
        code = code.wrapping_add(1);
        cprint!(con, Color::BLACK, Color::WHITE, "{:?}! ", key.key);
    }

    0
}
