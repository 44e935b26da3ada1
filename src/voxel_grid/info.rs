use std::env;
use std::sync::Once;

/// Print the program banner (only prints once)
pub fn print_banner() {
	static PRINT_BANNER_ONCE: Once = Once::new();
	PRINT_BANNER_ONCE.call_once(|| {
		eprintln!("grain_packer: statistical grain packing into voxel microstructures");
		eprintln!("Shapes: ellipsoid, super-ellipsoid, cube-octahedron, cylinder\n");
	});
}

/// Print compilation information (only prints once)
pub fn print_compile_info() {
	static PRINT_COMPILE_ONCE: Once = Once::new();
	PRINT_COMPILE_ONCE.call_once(|| {
		// Get the executable name
		let program_name = env::current_exe()
		.ok()
		.as_ref()
		.and_then(|path| path.file_name()) // Extract filename
		.and_then(|name| name.to_str()) // Convert to &str
		.unwrap_or("Unknown Program") // Fallback

		.to_string();

		eprintln!("Program: {}", program_name);
		eprintln!(
			"Compiled on: {} at {}",
			env!("COMPILE_DATE"),
					 env!("COMPILE_TIME")
		);
		eprintln!("Version: {}", env!("CARGO_PKG_VERSION"));
	});
}
