use flow_field_grid::{Grid, GridConfig, Toggle};
use grid_util::point::Point;

// In this example towers are placed on a 7x5 grid with shape
//  _______
// |S      |
// |       |
// |       |
// |       |
// |      T|
//  _______
// where
// - S marks the start the agents spawn at
// - T marks the target they walk to
//
// A wall is built across the grid. The last cell that would close it is refused, since the
// agents would no longer be able to reach the target. Run with RUST_LOG=debug to see the
// field updates and the refused placement.

fn main() {
    env_logger::init();
    let config = GridConfig {
        width: 7,
        height: 5,
        start: (0, 0),
        target: (6, 4),
    };
    let mut grid = match Grid::from_config(config) {
        Ok(grid) => grid,
        Err(e) => {
            eprintln!("Invalid grid: {e}");
            return;
        }
    };
    println!("{}", grid);

    for y in 0..5 {
        let p = Point::new(3, y);
        let outcome = grid.toggle(p);
        println!("Toggle {}: {:?}", p, outcome);
        if outcome == Toggle::Refused {
            println!("{} keeps the path open", p);
        }
    }
    println!("{}", grid);

    println!("Agent route:");
    for p in grid.path_from(grid.start()) {
        let weight = grid.get_node(p).map(|n| n.path_weight()).unwrap_or(f32::INFINITY);
        println!("{} ({:.2} to go)", p, weight);
    }
    println!(
        "{} reachability probes for {} cells",
        grid.path_field().probe_count(),
        grid.width() * grid.height()
    );
}
