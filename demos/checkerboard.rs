use glitterpanel::{frame::pixel_index, Brightness, GlitterPanel, NoEvents, NusbHost, Result, PIXELS};
use std::{thread, time::Duration};

// Frame cadence. The panel keeps the last frame it was shown, so this only
// needs to be fast enough for a smooth blink.
const TICK: Duration = Duration::from_millis(500);

fn main() -> Result<()> {
    env_logger::init();

    let panel = GlitterPanel::new(NusbHost::new(), NoEvents);

    println!("Looking for a Glitter Panel...");
    while !panel.connect()? {
        thread::sleep(Duration::from_millis(500));
    }
    println!("Connected. Blinking a checkerboard (Press Ctrl+C to stop)");

    let mut phase = false;
    loop {
        let mut grid = [false; PIXELS];
        for y in 0..16 {
            for x in 0..16 {
                grid[pixel_index(x, y)] = (x + y) % 2 == usize::from(phase);
            }
        }
        panel.display(Brightness::Per100, &grid)?;
        phase = !phase;
        thread::sleep(TICK);
    }
}
