use caruti::{
    AppConfig, AsteroidFieldScene, DenseGrassScene, EnvironmentMappingScene, GpuContext,
    ResourceDirs, Scene, ScreenEffect, SponzaScene, TransparentWindowsScene, WoodFloorScene,
    logging, run,
};

/// The demo scenes shipped with the crate.
#[allow(dead_code)]
#[derive(Clone, Copy, Debug)]
enum Demo {
    WoodFloor,
    DenseGrass,
    AsteroidField,
    Sponza,
    EnvironmentMapping,
    TransparentWindows,
}

const DEMO: Demo = Demo::WoodFloor;
const GRASS_EFFECT: ScreenEffect = ScreenEffect::None;

impl Demo {
    fn build(self, gpu: &GpuContext, dirs: &ResourceDirs) -> Box<dyn Scene> {
        match self {
            Demo::WoodFloor => Box::new(WoodFloorScene::new(gpu, dirs)),
            Demo::DenseGrass => Box::new(DenseGrassScene::with_effect(gpu, dirs, GRASS_EFFECT)),
            Demo::AsteroidField => Box::new(AsteroidFieldScene::new(gpu, dirs)),
            Demo::Sponza => Box::new(SponzaScene::new(gpu, dirs)),
            Demo::EnvironmentMapping => Box::new(EnvironmentMappingScene::new(gpu, dirs)),
            Demo::TransparentWindows => Box::new(TransparentWindowsScene::new(gpu, dirs)),
        }
    }
}

fn main() {
    logging::init();
    log::info!("Starting {DEMO:?} demo");

    if let Err(err) = run(AppConfig::default(), |gpu, dirs| DEMO.build(gpu, dirs)) {
        log::error!("{err}");
        std::process::exit(1);
    }
}
