fn main() {
    voxel_subsample::cli::run();
}
