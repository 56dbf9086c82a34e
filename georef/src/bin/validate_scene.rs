//! Quick scene validation utility

use std::{env, path::Path};

use georef::core::entity::World;
use georef::io::Scene;
use georef::sublevels::InstantLevelStreaming;

fn main() {
    georef::init_logging();

    let args: Vec<String> = env::args().collect();
    let scene_path = if args.len() > 1 {
        &args[1]
    } else {
        "assets/scenes/default.json"
    };

    let path = Path::new(scene_path);
    println!("Validating scene: {}", path.display());

    match Scene::load_from_file(path) {
        Ok(scene) => {
            println!("✓ Scene loaded successfully!");
            println!("  Anchors: {}", scene.anchors.len());
            println!("  Sub-levels: {}", scene.sub_levels.len());

            let mut world = World::new();
            let host = InstantLevelStreaming::new();
            match scene.instantiate(&mut world, &host) {
                Ok((georeference, switcher)) => {
                    println!("✓ Scene instantiated successfully!");

                    let origin = georeference.origin();
                    println!(
                        "  Origin: ({:.6}°, {:.6}°, {:.2} m), scale {}",
                        origin.longitude_degrees(),
                        origin.latitude_degrees(),
                        origin.height,
                        georeference.scale()
                    );
                    println!("  Registered sub-levels: {}", switcher.levels().len());

                    let anchored = world
                        .query::<&georef::core::coordinates::GlobeAnchor>()
                        .iter()
                        .count();
                    println!("  Anchored entities: {anchored}");
                }
                Err(e) => {
                    eprintln!("✗ Failed to instantiate scene: {e}");
                }
            }
        }
        Err(e) => {
            eprintln!("✗ Failed to load scene: {e}");
        }
    }
}
