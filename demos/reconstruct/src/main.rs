use argh::FromArgs;
use std::path::PathBuf;

use recon::image::Image;
use recon::imgproc::{color::gray_from_rgb_u8, features::FastParams};
use recon::io::{
    calibration::load_stereo_calibration, frame::load_depth_frame, png::read_image_png_rgb8,
    png::write_image_png_rgb8,
};
use recon::k3d::{pnp::PnPRansacParams, pointcloud::ColorCloud, pose::Pose};
use recon::matching::{
    find_features, find_pose, find_pose_error, get_scene_points, match_features, MatchParams,
    SceneParams,
};

#[derive(FromArgs)]
/// Estimate the motion between two views and export the colored cloud of the first one
struct Args {
    /// path to the color image of the first view
    #[argh(option)]
    color1: PathBuf,

    /// path to the 16 bit depth map of the first view
    #[argh(option)]
    depth1: PathBuf,

    /// path to the color image of the second view
    #[argh(option)]
    color2: PathBuf,

    /// path to the stereo calibration json file
    #[argh(option)]
    calibration: PathBuf,

    /// path to the output ply file
    #[argh(option)]
    output: PathBuf,

    /// side of the feature deduplication cell in pixels
    #[argh(option, default = "16")]
    block_size: usize,

    /// keep every n-th cloud sample along each axis
    #[argh(option, default = "1")]
    step: usize,

    /// optional path to write the cloud rendered from the second view
    #[argh(option)]
    render: Option<PathBuf>,
}

fn to_gray(image: &Image<u8, 3>) -> Result<Image<u8, 1>, Box<dyn std::error::Error>> {
    let mut gray = Image::from_size_val(image.size(), 0u8)?;
    gray_from_rgb_u8(image, &mut gray)?;
    Ok(gray)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let calibration = load_stereo_calibration(&args.calibration)?;
    let camera = calibration.camera1()?;

    let frame = load_depth_frame(&args.color1, &args.depth1)?;
    let color2 = read_image_png_rgb8(&args.color2)?;
    println!("Loaded frames: {}", frame.color.size());

    let gray1 = to_gray(&frame.color)?;
    let gray2 = to_gray(&color2)?;

    let points = find_features(&gray1, args.block_size, &FastParams::default())?;
    let matches = match_features(&gray1, &gray2, &points, &MatchParams::default())?;
    println!("Features: #{} Matches: #{}", points.len(), matches.len());

    let (scene, image) = get_scene_points(&camera, &frame.depth, &matches, &SceneParams::default());

    // a frame pair without a usable pose still yields a cloud in the first view
    let pose = match find_pose(&camera, &scene, &image, &PnPRansacParams::default()) {
        Ok(pose) => {
            let error = find_pose_error(&camera, &pose, &scene, &image)?;
            println!("Pose: {:?}", pose.matrix());
            println!("Pose error: {error:.3} px over #{} points", scene.len());
            pose
        }
        Err(e) => {
            log::warn!("pose estimation failed: {e}");
            Pose::IDENTITY
        }
    };

    let mut cloud = ColorCloud::build(&camera, &frame.color, &frame.depth)?;
    if args.step > 1 {
        cloud = cloud.subsample(args.step)?;
    }
    println!("Cloud: #{} vertices", cloud.vertex_count());

    if let Some(render_path) = args.render {
        let view = cloud.render_image(&camera, &pose, args.step.max(1))?;
        write_image_png_rgb8(&render_path, &view.image)?;
        println!("Rendered view written to {}", render_path.display());
    }

    cloud.save(&args.output)?;
    println!("Cloud written to {}", args.output.display());

    Ok(())
}
