use glitterpanel::{Brightness, GlitterPanel, NoEvents, NusbHost, Result, PIXELS};
use std::{thread, time::Duration};

fn main() -> Result<()> {
    env_logger::init();

    let panel = GlitterPanel::new(NusbHost::new(), NoEvents);

    println!("Looking for a Glitter Panel...");
    while !panel.connect()? {
        thread::sleep(Duration::from_millis(500));
    }
    println!("Connected. Stepping through the brightness levels (Press Ctrl+C to stop)");

    let grid = [true; PIXELS];
    loop {
        for level in Brightness::ALL {
            println!("{level:?}");
            panel.display(level, &grid)?;
            thread::sleep(Duration::from_secs(1));
        }
    }
}
