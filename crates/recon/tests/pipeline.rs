use glam::{DVec2, DVec3};
use rand::{rngs::StdRng, Rng, SeedableRng};

use recon::image::Image;
use recon::imgproc::{color::gray_from_rgb_u8, features::FastParams};
use recon::k3d::{
    camera::PinholeCamera,
    io::ply::read_ply_ascii,
    pnp::PnPRansacParams,
    pointcloud::ColorCloud,
    pose::Pose,
    random::random_pose,
};
use recon::matching::{
    find_features, find_pose, find_pose_error, get_scene_points, match_features, FeatureMatch,
    MatchParams, SceneParams,
};

#[test]
fn build_and_save_small_cloud() -> Result<(), Box<dyn std::error::Error>> {
    let camera = PinholeCamera::new(2.0, 2.0, 2.0, 2.0)?;
    let color = Image::<u8, 3>::from_size_val([4, 4].into(), 200)?;
    #[rustfmt::skip]
    let depth = Image::<u16, 1>::new([4, 4].into(), vec![
        0, 0, 0, 0,
        0, 5, 5, 0,
        0, 5, 5, 0,
        0, 0, 0, 0,
    ])?;

    let cloud = ColorCloud::build(&camera, &color, &depth)?;
    assert_eq!(cloud.size(), depth.size());
    assert_eq!(cloud.vertex_count(), 4);

    let tmp_dir = tempfile::tempdir()?;
    let path = tmp_dir.path().join("cloud.ply");
    cloud.save(&path)?;

    let text = std::fs::read_to_string(&path)?;
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines.contains(&"element vertex 4"));
    let end = lines
        .iter()
        .position(|l| *l == "end_header")
        .ok_or("missing end_header")?;
    assert_eq!(lines.len() - end - 1, 4);
    assert_eq!(lines[end + 1], "-2.500000 -2.500000 5.000000 200 200 200");

    let back = read_ply_ascii(&path)?;
    assert_eq!(back.len(), 4);
    assert_eq!(back.points()[3], DVec3::new(0.0, 0.0, 5.0));
    Ok(())
}

#[test]
fn pose_from_cloud_correspondences() -> Result<(), Box<dyn std::error::Error>> {
    let camera = PinholeCamera::new(525.0, 525.0, 32.0, 24.0)?;
    let mut rng = StdRng::seed_from_u64(5);

    let (width, height) = (64, 48);
    let color_data: Vec<u8> = (0..width * height * 3).map(|_| rng.random()).collect();
    let color = Image::<u8, 3>::new([width, height].into(), color_data)?;
    let depth_data: Vec<u16> = (0..width * height)
        .map(|_| rng.random_range(1500..3000))
        .collect();
    let depth = Image::<u16, 1>::new([width, height].into(), depth_data)?;

    let cloud = ColorCloud::build(&camera, &color, &depth)?;
    let pose = random_pose(
        &mut rng,
        &[-3.0..3.0, -3.0..3.0, -3.0..3.0],
        &[-50.0..50.0, -50.0..50.0, -20.0..20.0],
    );

    // observe every 4th pixel of the cloud from the moved camera
    let mut matches = Vec::new();
    for y in (0..height).step_by(4) {
        for x in (0..width).step_by(4) {
            let sample = cloud.sample(x, y).ok_or("sample out of bounds")?;
            let seen = camera.project(pose.transform_point(sample.point));
            matches.push(FeatureMatch::new(DVec2::new(x as f64, y as f64), seen));
        }
    }

    let (scene, image) = get_scene_points(&camera, &depth, &matches, &SceneParams::default());
    assert_eq!(scene.len(), matches.len());

    let estimate = find_pose(&camera, &scene, &image, &PnPRansacParams::default())?;
    assert!(estimate.matrix().abs_diff_eq(*pose.matrix(), 1e-4));

    let error = find_pose_error(&camera, &estimate, &scene, &image)?;
    assert!(error < 1e-3);

    // moving the cloud with the estimate lands it on the observations
    let moved = cloud.transform(&estimate);
    let projected = moved.project_image_points(&camera)?;
    let first = projected.pixel(0, 0).ok_or("pixel out of bounds")?;
    assert!(DVec2::new(first[0], first[1]).distance(image[0]) < 1e-3);
    Ok(())
}

#[test]
fn match_features_on_rendered_view() -> Result<(), Box<dyn std::error::Error>> {
    // a fronto-parallel textured plane seen by a camera moved sideways renders as an exact shift
    let (width, height) = (96, 96);
    let camera = PinholeCamera::new(500.0, 500.0, 48.0, 48.0)?;
    let mut rng = StdRng::seed_from_u64(17);

    let blocks: Vec<u8> = (0..(width / 4) * (height / 4)).map(|_| rng.random()).collect();
    let mut color = Image::<u8, 3>::from_size_val([width, height].into(), 0)?;
    for y in 0..height {
        for x in 0..width {
            let value = blocks[(y / 4) * (width / 4) + x / 4];
            for c in 0..3 {
                color.set_pixel(x, y, c, value)?;
            }
        }
    }
    let depth = Image::<f64, 1>::from_size_val([width, height].into(), 1000.0)?;

    let cloud = ColorCloud::build(&camera, &color, &depth)?;
    let motion = Pose::from_rotation_translation(&glam::DMat3::IDENTITY, DVec3::new(6.0, 0.0, 0.0));
    let view = cloud.render_image(&camera, &motion, 1)?;

    assert_eq!(view.depth.get_pixel(2, 50, 0)?, 0.0);
    assert_eq!(view.depth.get_pixel(3, 50, 0)?, 1000.0);
    assert_eq!(
        view.image.get_pixel(40, 50, 0)?,
        color.get_pixel(37, 50, 0)?
    );

    let mut left = Image::<u8, 1>::from_size_val([width, height].into(), 0)?;
    let mut right = Image::<u8, 1>::from_size_val([width, height].into(), 0)?;
    gray_from_rgb_u8(&color, &mut left)?;
    gray_from_rgb_u8(&view.image, &mut right)?;

    let points = find_features(&left, 8, &FastParams::default())?;
    assert!(!points.is_empty());

    let matches = match_features(&left, &right, &points, &MatchParams::default())?;
    assert!(matches.len() >= 8);

    let mut dx: Vec<f64> = matches.iter().map(|m| m.point2.x - m.point1.x).collect();
    dx.sort_by(f64::total_cmp);
    assert!((dx[dx.len() / 2] - 3.0).abs() < 0.1);
    Ok(())
}
