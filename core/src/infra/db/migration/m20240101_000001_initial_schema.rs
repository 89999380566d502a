//! Relational schema searched by the asset query builder

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
	async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		// Stacks come first, assets point at them
		manager
			.create_table(
				Table::create()
					.table(AssetStack::Table)
					.if_not_exists()
					.col(ColumnDef::new(AssetStack::Id).uuid().not_null().primary_key())
					.col(ColumnDef::new(AssetStack::OwnerId).uuid().not_null())
					.col(ColumnDef::new(AssetStack::PrimaryAssetId).uuid().not_null())
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(Assets::Table)
					.if_not_exists()
					.col(ColumnDef::new(Assets::Id).uuid().not_null().primary_key())
					.col(ColumnDef::new(Assets::OwnerId).uuid().not_null())
					.col(ColumnDef::new(Assets::LibraryId).uuid())
					.col(ColumnDef::new(Assets::DeviceAssetId).string().not_null())
					.col(ColumnDef::new(Assets::DeviceId).string().not_null())
					.col(ColumnDef::new(Assets::AssetType).string().not_null())
					.col(ColumnDef::new(Assets::Checksum).binary().not_null())
					.col(ColumnDef::new(Assets::OriginalPath).string().not_null())
					.col(ColumnDef::new(Assets::OriginalFileName).string().not_null())
					.col(ColumnDef::new(Assets::PreviewPath).string())
					.col(ColumnDef::new(Assets::ThumbnailPath).string())
					.col(ColumnDef::new(Assets::EncodedVideoPath).string())
					.col(ColumnDef::new(Assets::LivePhotoVideoId).uuid())
					.col(ColumnDef::new(Assets::StackId).uuid())
					.col(ColumnDef::new(Assets::Duration).string())
					.col(
						ColumnDef::new(Assets::IsFavorite)
							.boolean()
							.not_null()
							.default(false),
					)
					.col(
						ColumnDef::new(Assets::IsArchived)
							.boolean()
							.not_null()
							.default(false),
					)
					.col(
						ColumnDef::new(Assets::IsExternal)
							.boolean()
							.not_null()
							.default(false),
					)
					.col(
						ColumnDef::new(Assets::IsOffline)
							.boolean()
							.not_null()
							.default(false),
					)
					.col(
						ColumnDef::new(Assets::IsReadOnly)
							.boolean()
							.not_null()
							.default(false),
					)
					.col(
						ColumnDef::new(Assets::IsVisible)
							.boolean()
							.not_null()
							.default(true),
					)
					.col(
						ColumnDef::new(Assets::FileCreatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.col(
						ColumnDef::new(Assets::FileModifiedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.col(
						ColumnDef::new(Assets::LocalDateTime)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.col(
						ColumnDef::new(Assets::CreatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.col(
						ColumnDef::new(Assets::UpdatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.col(ColumnDef::new(Assets::DeletedAt).timestamp_with_time_zone())
					.foreign_key(
						ForeignKey::create()
							.from(Assets::Table, Assets::StackId)
							.to(AssetStack::Table, AssetStack::Id)
							.on_delete(ForeignKeyAction::SetNull),
					)
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(Exif::Table)
					.if_not_exists()
					.col(ColumnDef::new(Exif::AssetId).uuid().not_null().primary_key())
					.col(ColumnDef::new(Exif::Make).string())
					.col(ColumnDef::new(Exif::Model).string())
					.col(ColumnDef::new(Exif::LensModel).string())
					.col(ColumnDef::new(Exif::ExifImageWidth).integer())
					.col(ColumnDef::new(Exif::ExifImageHeight).integer())
					.col(ColumnDef::new(Exif::FNumber).double())
					.col(ColumnDef::new(Exif::Iso).integer())
					.col(ColumnDef::new(Exif::DateTimeOriginal).timestamp_with_time_zone())
					.col(ColumnDef::new(Exif::Latitude).double())
					.col(ColumnDef::new(Exif::Longitude).double())
					.col(ColumnDef::new(Exif::City).string())
					.col(ColumnDef::new(Exif::State).string())
					.col(ColumnDef::new(Exif::Country).string())
					.col(ColumnDef::new(Exif::Description).text())
					.foreign_key(
						ForeignKey::create()
							.from(Exif::Table, Exif::AssetId)
							.to(Assets::Table, Assets::Id)
							.on_delete(ForeignKeyAction::Cascade),
					)
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(Person::Table)
					.if_not_exists()
					.col(ColumnDef::new(Person::Id).uuid().not_null().primary_key())
					.col(ColumnDef::new(Person::OwnerId).uuid().not_null())
					.col(ColumnDef::new(Person::Name).string().not_null().default(""))
					.col(ColumnDef::new(Person::BirthDate).date())
					.col(
						ColumnDef::new(Person::ThumbnailPath)
							.string()
							.not_null()
							.default(""),
					)
					.col(ColumnDef::new(Person::FaceAssetId).uuid())
					.col(
						ColumnDef::new(Person::IsHidden)
							.boolean()
							.not_null()
							.default(false),
					)
					.col(
						ColumnDef::new(Person::CreatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.col(
						ColumnDef::new(Person::UpdatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(AssetFaces::Table)
					.if_not_exists()
					.col(ColumnDef::new(AssetFaces::Id).uuid().not_null().primary_key())
					.col(ColumnDef::new(AssetFaces::AssetId).uuid().not_null())
					.col(ColumnDef::new(AssetFaces::PersonId).uuid())
					.col(ColumnDef::new(AssetFaces::ImageWidth).integer().not_null())
					.col(ColumnDef::new(AssetFaces::ImageHeight).integer().not_null())
					.col(ColumnDef::new(AssetFaces::BoundingBoxX1).integer().not_null())
					.col(ColumnDef::new(AssetFaces::BoundingBoxY1).integer().not_null())
					.col(ColumnDef::new(AssetFaces::BoundingBoxX2).integer().not_null())
					.col(ColumnDef::new(AssetFaces::BoundingBoxY2).integer().not_null())
					.foreign_key(
						ForeignKey::create()
							.from(AssetFaces::Table, AssetFaces::AssetId)
							.to(Assets::Table, Assets::Id)
							.on_delete(ForeignKeyAction::Cascade),
					)
					.foreign_key(
						ForeignKey::create()
							.from(AssetFaces::Table, AssetFaces::PersonId)
							.to(Person::Table, Person::Id)
							.on_delete(ForeignKeyAction::SetNull),
					)
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(SmartInfo::Table)
					.if_not_exists()
					.col(ColumnDef::new(SmartInfo::AssetId).uuid().not_null().primary_key())
					.col(ColumnDef::new(SmartInfo::Tags).json_binary())
					.col(ColumnDef::new(SmartInfo::Objects).json_binary())
					.foreign_key(
						ForeignKey::create()
							.from(SmartInfo::Table, SmartInfo::AssetId)
							.to(Assets::Table, Assets::Id)
							.on_delete(ForeignKeyAction::Cascade),
					)
					.to_owned(),
			)
			.await?;

		// Indexes backing the search filters and the default ordering
		for (name, column) in [
			("idx_assets_owner_id", Assets::OwnerId),
			("idx_assets_file_created_at", Assets::FileCreatedAt),
			("idx_assets_stack_id", Assets::StackId),
			("idx_assets_live_photo_video_id", Assets::LivePhotoVideoId),
		] {
			manager
				.create_index(
					Index::create()
						.name(name)
						.table(Assets::Table)
						.col(column)
						.to_owned(),
				)
				.await?;
		}

		manager
			.create_index(
				Index::create()
					.name("idx_asset_faces_asset_id")
					.table(AssetFaces::Table)
					.col(AssetFaces::AssetId)
					.to_owned(),
			)
			.await?;

		manager
			.create_index(
				Index::create()
					.name("idx_asset_faces_person_id")
					.table(AssetFaces::Table)
					.col(AssetFaces::PersonId)
					.to_owned(),
			)
			.await?;

		Ok(())
	}

	async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		manager
			.drop_table(Table::drop().table(SmartInfo::Table).if_exists().to_owned())
			.await?;
		manager
			.drop_table(Table::drop().table(AssetFaces::Table).if_exists().to_owned())
			.await?;
		manager
			.drop_table(Table::drop().table(Person::Table).if_exists().to_owned())
			.await?;
		manager
			.drop_table(Table::drop().table(Exif::Table).if_exists().to_owned())
			.await?;
		manager
			.drop_table(Table::drop().table(Assets::Table).if_exists().to_owned())
			.await?;
		manager
			.drop_table(Table::drop().table(AssetStack::Table).if_exists().to_owned())
			.await?;

		Ok(())
	}
}

#[derive(DeriveIden)]
enum Assets {
	Table,
	Id,
	OwnerId,
	LibraryId,
	DeviceAssetId,
	DeviceId,
	AssetType,
	Checksum,
	OriginalPath,
	OriginalFileName,
	PreviewPath,
	ThumbnailPath,
	EncodedVideoPath,
	LivePhotoVideoId,
	StackId,
	Duration,
	IsFavorite,
	IsArchived,
	IsExternal,
	IsOffline,
	IsReadOnly,
	IsVisible,
	FileCreatedAt,
	FileModifiedAt,
	LocalDateTime,
	CreatedAt,
	UpdatedAt,
	DeletedAt,
}

#[derive(DeriveIden)]
enum Exif {
	Table,
	AssetId,
	Make,
	Model,
	LensModel,
	ExifImageWidth,
	ExifImageHeight,
	FNumber,
	Iso,
	DateTimeOriginal,
	Latitude,
	Longitude,
	City,
	State,
	Country,
	Description,
}

#[derive(DeriveIden)]
enum Person {
	Table,
	Id,
	OwnerId,
	Name,
	BirthDate,
	ThumbnailPath,
	FaceAssetId,
	IsHidden,
	CreatedAt,
	UpdatedAt,
}

#[derive(DeriveIden)]
enum AssetFaces {
	Table,
	Id,
	AssetId,
	PersonId,
	ImageWidth,
	ImageHeight,
	BoundingBoxX1,
	BoundingBoxY1,
	BoundingBoxX2,
	BoundingBoxY2,
}

#[derive(DeriveIden)]
enum SmartInfo {
	Table,
	AssetId,
	Tags,
	Objects,
}

#[derive(DeriveIden)]
enum AssetStack {
	Table,
	Id,
	OwnerId,
	PrimaryAssetId,
}
