use clap::Parser;
use flow_scene::flow::{self, ViewerArgs};

fn main() -> anyhow::Result<()> {
    let config = ViewerArgs::parse().into_config()?;
    flow::run(config)
}
